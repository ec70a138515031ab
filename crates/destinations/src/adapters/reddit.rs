//! Discussion-platform Conversions API adaptor.
//!
//! Only events with a tracking type are sent. Every identifier in the user
//! block is hashed here, including the client IP, which is always hashed
//! from the raw address regardless of what any other destination received.

use relay_core::config::RedditConfig;
use relay_core::hashing::{ensure_hashed, sha256_normalized};
use relay_core::money::to_minor_units;
use relay_core::{CanonicalEvent, EventName, Product, RelayResult};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{Destination, OutboundBody, OutboundRequest, Platform};

/// Category attached to every product entry.
const PRODUCT_CATEGORY: &str = "product";

pub struct RedditAdapter {
    config: RedditConfig,
}

impl RedditAdapter {
    pub fn new(config: RedditConfig) -> Self {
        Self { config }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.config.conversions_api_url.trim_end_matches('/'),
            self.config.pixel_id
        )
    }

    /// Tracking type for an event, `None` for events this platform does not
    /// track.
    pub fn tracking_type(name: &EventName) -> Option<&'static str> {
        match name {
            EventName::ViewContent => Some("ViewContent"),
            EventName::AddToCart => Some("AddToCart"),
            EventName::Purchase => Some("Purchase"),
            EventName::Lead => Some("Lead"),
            EventName::Other(_) => None,
        }
    }

    fn build_metadata(event: &CanonicalEvent, products: &[Product]) -> Map<String, Value> {
        let mut metadata = Map::new();
        if let Some(ref event_id) = event.event_id {
            metadata.insert("conversion_id".into(), json!(event_id));
        }
        if let Some(ref custom) = event.custom_data {
            if let Some(value) = custom.value {
                metadata.insert("value".into(), json!(to_minor_units(value)));
            }
            if let Some(ref currency) = custom.currency {
                metadata.insert("currency".into(), json!(currency));
            }
        }
        if !products.is_empty() {
            let entries: Vec<Value> = products
                .iter()
                .map(|p| {
                    json!({
                        "id": p.id,
                        "name": p.name,
                        "category": PRODUCT_CATEGORY,
                    })
                })
                .collect();
            metadata.insert("products".into(), Value::Array(entries));
            metadata.insert("item_count".into(), json!(products.len()));
        }
        metadata
    }

    fn build_user(event: &CanonicalEvent) -> Map<String, Value> {
        let user_data = &event.user_data;
        let mut user = Map::new();
        if let Some(email) = user_data.em.first() {
            user.insert("email".into(), json!(ensure_hashed(email)));
        }
        if let Some(phone) = user_data.ph.first() {
            user.insert("external_id".into(), json!(ensure_hashed(phone)));
        }
        if !user_data.client_ip_address.is_empty() {
            user.insert(
                "ip_address".into(),
                json!(sha256_normalized(&user_data.client_ip_address)),
            );
        }
        if let Some(ref user_agent) = user_data.client_user_agent {
            user.insert("user_agent".into(), json!(user_agent));
        }
        user
    }

    /// Build the Conversions API payload, `None` for untracked events.
    pub fn build_payload(&self, event: &CanonicalEvent, products: &[Product]) -> Option<Value> {
        let tracking_type = Self::tracking_type(&event.event_name)?;

        let mut reddit_event = json!({
            "event_at": event.event_datetime().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            "event_type": {
                "tracking_type": tracking_type,
            },
        });

        let metadata = Self::build_metadata(event, products);
        if !metadata.is_empty() {
            reddit_event["event_metadata"] = Value::Object(metadata);
        }
        if let Some(ref click_id) = event.click_id {
            reddit_event["click_id"] = json!(click_id);
        }
        let user = Self::build_user(event);
        if !user.is_empty() {
            reddit_event["user"] = Value::Object(user);
        }

        Some(json!({ "events": [reddit_event] }))
    }
}

impl Destination for RedditAdapter {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    fn is_configured(&self) -> bool {
        !self.config.access_token.trim().is_empty()
    }

    fn build_request(
        &self,
        event: &CanonicalEvent,
        products: &[Product],
    ) -> RelayResult<Option<OutboundRequest>> {
        if !self.is_configured() {
            return Ok(None);
        }
        let Some(payload) = self.build_payload(event, products) else {
            debug!(event_name = %event.event_name, "Reddit has no tracking type, skipping");
            return Ok(None);
        };

        Ok(Some(OutboundRequest {
            platform: Platform::Reddit,
            event_name: Self::tracking_type(&event.event_name)
                .unwrap_or_default()
                .to_string(),
            url: self.endpoint(),
            headers: vec![(
                "Authorization",
                format!("Bearer {}", self.config.access_token),
            )],
            body: OutboundBody::Json(payload),
        }))
    }
}
