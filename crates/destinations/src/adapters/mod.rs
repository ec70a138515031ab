//! Adapters translating a [`CanonicalEvent`] into each destination's wire
//! request.
//!
//! Adapters are pure: they build an [`OutboundRequest`] and never touch the
//! network. [`crate::sender::HttpSender`] performs the POST.

pub mod meta;
pub mod reddit;
pub mod tiktok;

use relay_core::{CanonicalEvent, Product, RelayResult};
use serde_json::Value;

pub use meta::MetaAdapter;
pub use reddit::RedditAdapter;
pub use tiktok::TikTokAdapter;

/// The destinations this relay knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Meta,
    TikTok,
    Reddit,
}

impl Platform {
    /// Short identifier used in metrics labels and log record keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Meta => "meta",
            Platform::TikTok => "tiktok",
            Platform::Reddit => "reddit",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

/// A fully built destination request.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub platform: Platform,
    /// Event name as the destination knows it.
    pub event_name: String,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: OutboundBody,
}

/// One implementation per destination.
pub trait Destination: Send + Sync {
    fn platform(&self) -> Platform;

    /// Whether the destination has the credential it needs.
    fn is_configured(&self) -> bool;

    /// Build the wire request, or `None` when this destination should be
    /// skipped for the event.
    fn build_request(
        &self,
        event: &CanonicalEvent,
        products: &[Product],
    ) -> RelayResult<Option<OutboundRequest>>;
}
