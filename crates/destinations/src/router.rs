//! Destination router. Fans a canonical event out to every destination and
//! collects one outcome per destination.

use std::time::Duration;

use relay_core::config::AppConfig;
use relay_core::{CanonicalEvent, Product, RelayError, RelayResult};
use tracing::{debug, info};

use crate::adapters::{Destination, MetaAdapter, RedditAdapter, TikTokAdapter};
use crate::outcome::DispatchOutcome;
use crate::sender::HttpSender;

/// Outcome of one fan-out. `meta` is the authoritative result for the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub meta: DispatchOutcome,
    pub tiktok: DispatchOutcome,
    pub reddit: DispatchOutcome,
}

impl DispatchReport {
    pub fn primary(&self) -> &DispatchOutcome {
        &self.meta
    }
}

/// Routes events to the configured destinations.
pub struct DestinationRouter {
    meta: MetaAdapter,
    tiktok: TikTokAdapter,
    reddit: RedditAdapter,
    sender: HttpSender,
}

impl DestinationRouter {
    /// Build from config. Fails when the primary credential is missing.
    pub fn new(config: &AppConfig) -> RelayResult<Self> {
        let meta = MetaAdapter::new(config.meta.clone());
        if !meta.is_configured() {
            return Err(RelayError::Config("META_ACCESS_TOKEN is not set".into()));
        }

        let sender = HttpSender::new(Duration::from_millis(config.dispatch.timeout_ms))?;
        let router = Self::from_parts(
            meta,
            TikTokAdapter::new(config.tiktok.clone()),
            RedditAdapter::new(config.reddit.clone()),
            sender,
        );

        info!(
            tiktok_enabled = router.tiktok.is_configured(),
            reddit_enabled = router.reddit.is_configured(),
            timeout_ms = config.dispatch.timeout_ms,
            "Destination router initialized"
        );

        Ok(router)
    }

    pub fn from_parts(
        meta: MetaAdapter,
        tiktok: TikTokAdapter,
        reddit: RedditAdapter,
        sender: HttpSender,
    ) -> Self {
        Self {
            meta,
            tiktok,
            reddit,
            sender,
        }
    }

    /// Dispatch to every destination. Meta, TikTok and Reddit are started
    /// in that order and awaited together; each carries its own timeout, so
    /// the slowest destination bounds the call.
    pub async fn dispatch(&self, event: &CanonicalEvent, products: &[Product]) -> DispatchReport {
        let (meta, tiktok, reddit) = tokio::join!(
            self.dispatch_one(&self.meta, event, products),
            self.dispatch_one(&self.tiktok, event, products),
            self.dispatch_one(&self.reddit, event, products),
        );

        DispatchReport {
            meta,
            tiktok,
            reddit,
        }
    }

    async fn dispatch_one(
        &self,
        destination: &dyn Destination,
        event: &CanonicalEvent,
        products: &[Product],
    ) -> DispatchOutcome {
        let platform = destination.platform().as_str();

        match destination.build_request(event, products) {
            Ok(Some(request)) => self.sender.send(request).await,
            Ok(None) => {
                debug!(platform, event_name = %event.event_name, "Destination skipped");
                metrics::counter!("relay.dispatch.skipped", "platform" => platform).increment(1);
                DispatchOutcome::NotConfigured
            }
            Err(e) => {
                metrics::counter!("relay.dispatch.failed", "platform" => platform).increment(1);
                DispatchOutcome::failed(e)
            }
        }
    }

    pub fn active_destination_count(&self) -> usize {
        [
            self.meta.is_configured(),
            self.tiktok.is_configured(),
            self.reddit.is_configured(),
        ]
        .into_iter()
        .filter(|enabled| *enabled)
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::{bare_event, purchase_event};
    use axum::routing::post;
    use axum::{Json, Router};
    use relay_core::EventName;
    use serde_json::{json, Value};

    async fn spawn_destinations() -> String {
        let app = Router::new()
            .route(
                "/meta/:pixel/events",
                post(|| async { Json(json!({"events_received": 1})) }),
            )
            .route(
                "/tiktok/track",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({"code": 0, "event": body["event"]}))
                }),
            )
            .route(
                "/reddit/:account",
                post(|| async { Json(json!({"message": "Successfully processed 1 conversion events."})) }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn config(base: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.dispatch.timeout_ms = 2_000;
        config.meta.access_token = "EAAB-token".into();
        config.meta.pixel_id = "123".into();
        config.meta.graph_api_url = format!("{base}/meta");
        config.tiktok.access_token = "tt-token".into();
        config.tiktok.events_api_url = format!("{base}/tiktok/track");
        config.reddit.access_token = "rdt-token".into();
        config.reddit.pixel_id = "a2_account".into();
        config.reddit.conversions_api_url = format!("{base}/reddit");
        config
    }

    #[test]
    fn test_missing_primary_credential_is_config_error() {
        let result = DestinationRouter::new(&AppConfig::default());
        assert!(matches!(result, Err(RelayError::Config(_))));
    }

    #[tokio::test]
    async fn test_fan_out_to_all_destinations() {
        let base = spawn_destinations().await;
        let router = DestinationRouter::new(&config(&base)).unwrap();
        assert_eq!(router.active_destination_count(), 3);

        let event = purchase_event();
        let report = router.dispatch(&event, &event.products()).await;

        assert_eq!(report.primary().status_code(), Some(200));
        assert_eq!(report.meta.response().unwrap().1["events_received"], 1);
        assert_eq!(report.tiktok.response().unwrap().1["event"], "CompletePayment");
        assert_eq!(report.reddit.status_code(), Some(200));
    }

    #[tokio::test]
    async fn test_unconfigured_secondaries_are_skipped() {
        let base = spawn_destinations().await;
        let mut config = config(&base);
        config.tiktok.access_token.clear();
        config.reddit.access_token.clear();
        let router = DestinationRouter::new(&config).unwrap();
        assert_eq!(router.active_destination_count(), 1);

        let report = router.dispatch(&purchase_event(), &[]).await;
        assert_eq!(report.meta.status_code(), Some(200));
        assert_eq!(report.tiktok, DispatchOutcome::NotConfigured);
        assert_eq!(report.reddit, DispatchOutcome::NotConfigured);
    }

    #[tokio::test]
    async fn test_untracked_event_skips_reddit_only() {
        let base = spawn_destinations().await;
        let router = DestinationRouter::new(&config(&base)).unwrap();

        let report = router
            .dispatch(&bare_event(EventName::Other("Subscribe".into())), &[])
            .await;
        assert!(report.meta.is_attempted());
        assert!(report.tiktok.is_attempted());
        assert_eq!(report.reddit, DispatchOutcome::NotConfigured);
    }

    #[tokio::test]
    async fn test_secondary_outage_does_not_affect_primary() {
        let base = spawn_destinations().await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = listener.local_addr().unwrap();
        drop(listener);

        let mut config = config(&base);
        config.tiktok.events_api_url = format!("http://{dead}/track");
        config.reddit.conversions_api_url = format!("http://{dead}/reddit");
        let router = DestinationRouter::new(&config).unwrap();

        let report = router.dispatch(&purchase_event(), &[]).await;
        assert_eq!(report.meta.status_code(), Some(200));
        assert!(matches!(report.tiktok, DispatchOutcome::Failed { status_code: 500, .. }));
        assert!(matches!(report.reddit, DispatchOutcome::Failed { status_code: 500, .. }));
    }

    #[tokio::test]
    async fn test_primary_outage_is_reported_as_failure() {
        let base = spawn_destinations().await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = listener.local_addr().unwrap();
        drop(listener);

        let mut config = config(&base);
        config.meta.graph_api_url = format!("http://{dead}");
        let router = DestinationRouter::new(&config).unwrap();

        let report = router.dispatch(&purchase_event(), &[]).await;
        let (status, body) = report.primary().response().unwrap();
        assert_eq!(status, 500);
        assert!(body["error"].is_string());
        assert_eq!(report.tiktok.status_code(), Some(200));
    }
}
