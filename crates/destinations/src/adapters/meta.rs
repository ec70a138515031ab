//! Social-ads Conversions API adaptor (primary destination).
//!
//! The event is sent as a form post: `data` holds a JSON array with the
//! single sanitized event and `access_token` carries the credential.

use relay_core::config::MetaConfig;
use relay_core::{CanonicalEvent, Product, RelayResult};
use tracing::debug;

use super::{Destination, OutboundBody, OutboundRequest, Platform};

pub struct MetaAdapter {
    config: MetaConfig,
}

impl MetaAdapter {
    pub fn new(config: MetaConfig) -> Self {
        Self { config }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}/events",
            self.config.graph_api_url.trim_end_matches('/'),
            self.config.pixel_id
        )
    }

    /// Copy of the event with plaintext identifiers and the short-video
    /// click id removed. Hashed `em`/`ph` and `fbc` stay.
    pub fn sanitize(event: &CanonicalEvent) -> CanonicalEvent {
        let mut sanitized = event.clone();
        sanitized.user_data.email = None;
        sanitized.user_data.phone = None;
        sanitized.user_data.ttclid = None;
        sanitized
    }

    /// Form fields for the Conversions API.
    pub fn form_fields(&self, event: &CanonicalEvent) -> RelayResult<Vec<(String, String)>> {
        let data = serde_json::to_string(&[Self::sanitize(event)])?;
        Ok(vec![
            ("data".to_string(), data),
            ("access_token".to_string(), self.config.access_token.clone()),
        ])
    }
}

impl Destination for MetaAdapter {
    fn platform(&self) -> Platform {
        Platform::Meta
    }

    fn is_configured(&self) -> bool {
        !self.config.access_token.trim().is_empty()
    }

    fn build_request(
        &self,
        event: &CanonicalEvent,
        _products: &[Product],
    ) -> RelayResult<Option<OutboundRequest>> {
        if !self.is_configured() {
            return Ok(None);
        }

        let fields = self.form_fields(event)?;

        debug!(
            event_name = %event.event_name,
            pixel_id = %self.config.pixel_id,
            "Meta CAPI event transformed"
        );

        Ok(Some(OutboundRequest {
            platform: Platform::Meta,
            event_name: event.event_name.to_string(),
            url: self.endpoint(),
            headers: Vec::new(),
            body: OutboundBody::Form(fields),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::purchase_event;
    use serde_json::Value;

    fn test_config() -> MetaConfig {
        MetaConfig {
            access_token: "EAAB-token".into(),
            pixel_id: "123456".into(),
            graph_api_url: "https://graph.example.com/v24.0/".into(),
        }
    }

    fn sent_event(request: &OutboundRequest) -> Value {
        let OutboundBody::Form(fields) = &request.body else {
            panic!("expected form body");
        };
        let data = &fields.iter().find(|(k, _)| k == "data").unwrap().1;
        let events: Value = serde_json::from_str(data).unwrap();
        assert_eq!(events.as_array().unwrap().len(), 1);
        events[0].clone()
    }

    #[test]
    fn test_endpoint() {
        let adapter = MetaAdapter::new(test_config());
        assert_eq!(
            adapter.endpoint(),
            "https://graph.example.com/v24.0/123456/events"
        );
    }

    #[test]
    fn test_plaintext_pii_never_sent() {
        let adapter = MetaAdapter::new(test_config());
        let event = purchase_event();
        let request = adapter.build_request(&event, &[]).unwrap().unwrap();

        let OutboundBody::Form(fields) = &request.body else {
            panic!("expected form body");
        };
        for (_, value) in fields {
            assert!(!value.contains("alex.johnson@example.com"));
            assert!(!value.contains("\"phone\""));
        }

        let sent = sent_event(&request);
        let user_data = &sent["user_data"];
        assert!(user_data.get("email").is_none());
        assert!(user_data.get("phone").is_none());
        assert!(user_data.get("ttclid").is_none());
        assert_eq!(user_data["em"][0], event.user_data.em[0].as_str());
        assert_eq!(user_data["ph"][0], event.user_data.ph[0].as_str());
        assert_eq!(user_data["fbc"], "fb.1.1704067200000.abc");
        assert_eq!(user_data["client_ip_address"], "203.0.113.9");
    }

    #[test]
    fn test_access_token_field() {
        let adapter = MetaAdapter::new(test_config());
        let request = adapter.build_request(&purchase_event(), &[]).unwrap().unwrap();
        let OutboundBody::Form(fields) = &request.body else {
            panic!("expected form body");
        };
        assert!(fields.contains(&("access_token".to_string(), "EAAB-token".to_string())));
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_event_fields_preserved() {
        let adapter = MetaAdapter::new(test_config());
        let request = adapter.build_request(&purchase_event(), &[]).unwrap().unwrap();
        let sent = sent_event(&request);
        assert_eq!(sent["event_name"], "Purchase");
        assert_eq!(sent["event_time"], 1_704_067_200);
        assert_eq!(sent["event_id"], "evt-123");
        assert_eq!(sent["action_source"], "website");
        assert_eq!(sent["custom_data"]["value"], 19.99);
    }

    #[test]
    fn test_sanitize_leaves_original_untouched() {
        let event = purchase_event();
        let sanitized = MetaAdapter::sanitize(&event);
        assert!(sanitized.user_data.email.is_none());
        assert!(event.user_data.email.is_some());
        assert!(event.user_data.ttclid.is_some());
    }

    #[test]
    fn test_unconfigured() {
        let adapter = MetaAdapter::new(MetaConfig {
            access_token: String::new(),
            ..test_config()
        });
        assert!(!adapter.is_configured());
        assert!(adapter.build_request(&purchase_event(), &[]).unwrap().is_none());
    }
}
