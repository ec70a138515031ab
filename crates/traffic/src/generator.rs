//! Synthetic traffic driver.
//!
//! Builds realistic canonical events from the catalog and relays them through
//! the destination router, recording each attempt in an event log exactly as
//! the ingress handler would.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use relay_analytics::{DispatchRecord, EventLog};
use relay_core::event::{ACTION_SOURCE_WEBSITE, DEFAULT_CONTENT_TYPE, DEFAULT_CURRENCY};
use relay_core::hashing::sha256_normalized;
use relay_core::{CanonicalEvent, CustomData, EventName, UserData};
use relay_destinations::{DestinationRouter, DispatchReport};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog;

/// Tag stored on every log record this generator writes.
pub const TRAFFIC_SOURCE: &str = "generate_traffic";

/// Relative frequency of each generated event.
fn event_weights() -> [(EventName, u32); 3] {
    [
        (EventName::ViewContent, 50),
        (EventName::AddToCart, 30),
        (EventName::Purchase, 20),
    ]
}

#[derive(Debug, Clone)]
pub struct TrafficOptions {
    pub count: usize,
    /// Build events without dispatching them.
    pub dry_run: bool,
    /// Pause between dispatched events.
    pub interval: Duration,
}

impl Default for TrafficOptions {
    fn default() -> Self {
        Self {
            count: 100,
            dry_run: false,
            interval: Duration::from_millis(100),
        }
    }
}

/// Per-event progress handed to the caller's reporter.
#[derive(Debug)]
pub struct EventProgress<'a> {
    /// 1-based position in the run.
    pub position: usize,
    pub count: usize,
    pub event: &'a CanonicalEvent,
    /// `None` on dry runs.
    pub report: Option<&'a DispatchReport>,
}

impl EventProgress<'_> {
    pub fn primary_ok(&self) -> bool {
        self.report
            .map_or(true, |r| r.primary().status_code() == Some(200))
    }
}

impl fmt::Display for EventProgress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.event.event_id.as_deref().unwrap_or_default();
        let short_id = id.get(..8).unwrap_or(id);
        write!(f, "  [{}/{}] {}", self.position, self.count, self.event.event_name)?;

        let Some(report) = self.report else {
            return write!(f, " (dry-run) id={short_id}...");
        };
        if !self.primary_ok() {
            return match report.primary().response() {
                Some((status, body)) => write!(f, " META FAILED {status}: {body}"),
                None => write!(f, " META NOT CONFIGURED"),
            };
        }
        write!(f, " OK id={short_id}...")?;
        if let Some(status) = report.tiktok.status_code() {
            write!(f, " | TT:{status}")?;
        }
        if let Some(status) = report.reddit.status_code() {
            write!(f, " | RDT:{status}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrafficSummary {
    pub total: usize,
    pub dry_run: bool,
    pub per_event: BTreeMap<String, usize>,
    /// Events whose primary destination did not answer 200.
    pub primary_failures: usize,
    /// Records held by the event log once the run finished.
    pub logged: usize,
}

impl fmt::Display for TrafficSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .per_event
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(name, n)| format!("{n} {name}"))
            .collect();
        let verb = if self.dry_run { "Built" } else { "Sent" };
        write!(
            f,
            "Done. {verb} {} events ({}). Errors: {}",
            self.total,
            parts.join(", "),
            self.primary_failures
        )
    }
}

pub struct TrafficGenerator {
    router: Arc<DestinationRouter>,
    log: Arc<EventLog>,
    rng: StdRng,
}

impl TrafficGenerator {
    pub fn new(router: Arc<DestinationRouter>, log: Arc<EventLog>) -> Self {
        Self {
            router,
            log,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for reproducible runs.
    pub fn with_seed(router: Arc<DestinationRouter>, log: Arc<EventLog>, seed: u64) -> Self {
        Self {
            router,
            log,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn pick_event_name(&mut self) -> EventName {
        let weights = event_weights();
        let total: u32 = weights.iter().map(|(_, w)| w).sum();
        let mut roll = self.rng.gen_range(1..=total);
        for (name, weight) in weights.iter() {
            if roll <= *weight {
                return name.clone();
            }
            roll -= weight;
        }
        EventName::Purchase
    }

    /// One synthetic event with hashed identifiers and click ids.
    pub fn build_event(&mut self, now: DateTime<Utc>) -> CanonicalEvent {
        let event_name = self.pick_event_name();
        let shopper = catalog::random_shopper(&mut self.rng);
        let products = catalog::random_products(&mut self.rng);

        let value = products.iter().map(|p| p.price).sum::<f64>();
        let custom_data = CustomData {
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            content_ids: products.iter().map(|p| p.id.to_string()).collect(),
            content_names: products.iter().map(|p| p.name.to_string()).collect(),
            currency: Some(DEFAULT_CURRENCY.to_string()),
            value: Some((value * 100.0).round() / 100.0),
        };

        let user_data = UserData {
            client_ip_address: catalog::random_ip(&mut self.rng).to_string(),
            client_user_agent: Some(catalog::random_user_agent(&mut self.rng).to_string()),
            em: vec![sha256_normalized(shopper.email)],
            ph: vec![sha256_normalized(shopper.phone)],
            fbc: Some(catalog::random_fbc(&mut self.rng, now.timestamp_millis())),
            ttclid: Some(catalog::random_ttclid(&mut self.rng)),
            ..Default::default()
        };

        CanonicalEvent {
            event_source_url: Some(catalog::event_source_url(&event_name, &mut self.rng)),
            event_name,
            event_time: now.timestamp(),
            event_id: Some(Uuid::new_v4().to_string()),
            action_source: ACTION_SOURCE_WEBSITE.to_string(),
            click_id: Some(catalog::random_click_id(&mut self.rng)),
            user_data,
            custom_data: Some(custom_data),
        }
    }

    /// Generate `options.count` events, reporting each through `on_event`.
    pub async fn run<F>(&mut self, options: &TrafficOptions, mut on_event: F) -> TrafficSummary
    where
        F: FnMut(&EventProgress<'_>),
    {
        let mut summary = TrafficSummary {
            total: options.count,
            dry_run: options.dry_run,
            ..Default::default()
        };

        info!(count = options.count, dry_run = options.dry_run, "Generating synthetic events");

        for i in 0..options.count {
            let event = self.build_event(Utc::now());
            *summary
                .per_event
                .entry(event.event_name.to_string())
                .or_default() += 1;

            if options.dry_run {
                on_event(&EventProgress {
                    position: i + 1,
                    count: options.count,
                    event: &event,
                    report: None,
                });
                continue;
            }

            let report = self.router.dispatch(&event, &event.products()).await;
            self.log
                .append(DispatchRecord::new(&event, &report).with_source(TRAFFIC_SOURCE));

            let progress = EventProgress {
                position: i + 1,
                count: options.count,
                event: &event,
                report: Some(&report),
            };
            if !progress.primary_ok() {
                summary.primary_failures += 1;
                warn!(
                    event_name = %event.event_name,
                    status = ?report.primary().status_code(),
                    "Primary destination rejected synthetic event"
                );
            }
            on_event(&progress);

            if i + 1 < options.count && !options.interval.is_zero() {
                tokio::time::sleep(options.interval).await;
            }
        }

        summary.logged = self.log.len();
        info!(
            total = summary.total,
            primary_failures = summary.primary_failures,
            logged = summary.logged,
            "Synthetic traffic finished"
        );
        summary
    }
}
