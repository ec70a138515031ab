//! Short-video Events API adaptor.

use relay_core::config::TikTokConfig;
use relay_core::event::DEFAULT_CONTENT_TYPE;
use relay_core::{CanonicalEvent, EventName, Product, RelayResult};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{Destination, OutboundBody, OutboundRequest, Platform};

pub struct TikTokAdapter {
    config: TikTokConfig,
}

impl TikTokAdapter {
    pub fn new(config: TikTokConfig) -> Self {
        Self { config }
    }

    /// Map a canonical event name to the platform's standard event.
    pub fn event_name(name: &EventName) -> &str {
        match name {
            EventName::ViewContent => "ViewContent",
            EventName::AddToCart => "AddToCart",
            EventName::Purchase => "CompletePayment",
            EventName::Lead => "SubmitForm",
            EventName::Other(other) => other,
        }
    }

    fn build_contents(event: &CanonicalEvent, products: &[Product]) -> Vec<Value> {
        let content_type = event
            .custom_data
            .as_ref()
            .map_or(DEFAULT_CONTENT_TYPE, |cd| cd.content_type.as_str());

        products
            .iter()
            .map(|p| {
                json!({
                    "content_id": p.id,
                    "content_type": content_type,
                    "content_name": p.name,
                })
            })
            .collect()
    }

    fn build_context(event: &CanonicalEvent) -> Value {
        let user_data = &event.user_data;

        let mut user = Map::new();
        if let Some(email) = user_data.em.first() {
            user.insert("email".into(), json!(email));
        }
        if let Some(phone) = user_data.ph.first() {
            user.insert("phone_number".into(), json!(phone));
        }
        if let Some(ref ttclid) = user_data.ttclid {
            user.insert("ttclid".into(), json!(ttclid));
        }

        let mut context = json!({
            "user_agent": user_data.client_user_agent.as_deref().unwrap_or_default(),
            "ip": user_data.client_ip_address,
            "page": {
                "url": event.event_source_url.as_deref().unwrap_or_default(),
            },
        });
        if !user.is_empty() {
            context["user"] = Value::Object(user);
        }
        context
    }

    /// Build the Events API payload.
    pub fn build_payload(&self, event: &CanonicalEvent, products: &[Product]) -> Value {
        let mut properties = Map::new();
        let contents = Self::build_contents(event, products);
        if !contents.is_empty() {
            properties.insert("contents".into(), Value::Array(contents));
        }
        if let Some(ref custom) = event.custom_data {
            if let Some(ref currency) = custom.currency {
                properties.insert("currency".into(), json!(currency));
            }
            if let Some(value) = custom.value {
                properties.insert("value".into(), json!(value));
            }
        }

        json!({
            "pixel_code": self.config.pixel_id,
            "event": Self::event_name(&event.event_name),
            "event_id": event.event_id.as_deref().unwrap_or_default(),
            "timestamp": event.event_datetime().format("%Y-%m-%dT%H:%M:%S%z").to_string(),
            "context": Self::build_context(event),
            "properties": properties,
        })
    }
}

impl Destination for TikTokAdapter {
    fn platform(&self) -> Platform {
        Platform::TikTok
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

        let event_name = Self::event_name(&event.event_name).to_string();
        let payload = self.build_payload(event, products);

        debug!(
            event_name = %event_name,
            pixel_code = %self.config.pixel_id,
            "TikTok event transformed"
        );

        Ok(Some(OutboundRequest {
            platform: Platform::TikTok,
            event_name,
            url: self.config.events_api_url.clone(),
            headers: vec![("Access-Token", self.config.access_token.clone())],
            body: OutboundBody::Json(payload),
        }))
    }
}
