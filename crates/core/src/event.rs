//! Canonical conversion event. The single normalized representation that
//! every destination payload is derived from.
//!
//! Inbound bodies are loosely shaped JSON. They are decoded into
//! [`CanonicalEvent`] at the boundary by [`CanonicalEvent::build`]; nothing
//! downstream ever sees the raw body.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RelayError, RelayResult};
use crate::hashing::ensure_hashed;

/// Every event this deployment relays originates on the website.
pub const ACTION_SOURCE_WEBSITE: &str = "website";

pub const DEFAULT_CONTENT_TYPE: &str = "product";
pub const DEFAULT_CURRENCY: &str = "USD";

/// Conversion event name. Unknown names are carried through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventName {
    ViewContent,
    AddToCart,
    Purchase,
    Lead,
    Other(String),
}

impl EventName {
    pub fn as_str(&self) -> &str {
        match self {
            EventName::ViewContent => "ViewContent",
            EventName::AddToCart => "AddToCart",
            EventName::Purchase => "Purchase",
            EventName::Lead => "Lead",
            EventName::Other(name) => name,
        }
    }
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        match name {
            "ViewContent" => EventName::ViewContent,
            "AddToCart" => EventName::AddToCart,
            "Purchase" => EventName::Purchase,
            "Lead" => EventName::Lead,
            other => EventName::Other(other.to_string()),
        }
    }
}

impl From<String> for EventName {
    fn from(name: String) -> Self {
        EventName::from(name.as_str())
    }
}

impl From<EventName> for String {
    fn from(name: EventName) -> Self {
        name.as_str().to_string()
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub event_name: EventName,
    /// Unix seconds.
    pub event_time: i64,
    /// Caller-supplied id used by destinations to deduplicate against the
    /// browser pixel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub action_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_source_url: Option<String>,
    /// Discussion-platform click identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_id: Option<String>,
    pub user_data: UserData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<CustomData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    /// Always derived from the request, never from the body.
    pub client_ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_user_agent: Option<String>,
    /// SHA-256 digests of the normalized email, at most one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub em: Vec<String>,
    /// SHA-256 digests of the normalized phone number, at most one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ph: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fbc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fbp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttclid: Option<String>,
    /// Plaintext email as submitted. Kept for the audit snapshot only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Plaintext phone as submitted. Kept for the audit snapshot only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomData {
    pub content_type: String,
    /// Index-aligned with `content_names`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_names: Vec<String>,
    /// Filled with `USD` only when `value` is present; a value-less record
    /// carries no currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Major units, e.g. dollars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

/// One purchasable item associated with an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
}

/// Connection facts observed by the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub peer_ip: String,
    /// Raw `X-Forwarded-For` header, when present.
    pub forwarded_for: Option<String>,
}

impl RequestMeta {
    pub fn new(peer_ip: impl Into<String>, forwarded_for: Option<String>) -> Self {
        Self {
            peer_ip: peer_ip.into(),
            forwarded_for,
        }
    }

    /// First hop of the forwarded-for chain, else the direct peer.
    pub fn client_ip(&self) -> String {
        self.forwarded_for
            .as_deref()
            .and_then(|header| header.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map_or_else(|| self.peer_ip.clone(), str::to_string)
    }
}

impl CustomData {
    /// Products built from `content_ids`, paired with the name at the same
    /// index or an empty name when there is none.
    pub fn products(&self) -> Vec<Product> {
        self.content_ids
            .iter()
            .enumerate()
            .map(|(i, id)| Product {
                id: id.clone(),
                name: self.content_names.get(i).cloned().unwrap_or_default(),
            })
            .collect()
    }
}

impl CanonicalEvent {
    /// Build from a decoded request body, stamping absent times with now.
    pub fn build(body: &Value, meta: &RequestMeta) -> RelayResult<Self> {
        Self::build_at(body, meta, Utc::now().timestamp())
    }

    /// Build from a decoded request body with an explicit clock.
    pub fn build_at(body: &Value, meta: &RequestMeta, now: i64) -> RelayResult<Self> {
        let event_name = body
            .get("event_name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| RelayError::Validation("event_name is required".into()))?;

        let raw: RawEventBody = serde_json::from_value(body.clone())
            .map_err(|e| RelayError::Validation(format!("invalid event body: {e}")))?;

        let event_time = raw
            .event_time
            .as_ref()
            .and_then(|t| t.as_i64().or_else(|| t.as_f64().map(|f| f as i64)))
            .filter(|t| DateTime::from_timestamp(*t, 0).is_some())
            .unwrap_or(now);

        let mut user_data = raw.user_data.unwrap_or_default().normalize();
        user_data.client_ip_address = meta.client_ip();

        Ok(Self {
            event_name: EventName::from(event_name),
            event_time,
            event_id: raw.event_id.map(StringOrNumber::into_string).and_then(non_empty),
            action_source: ACTION_SOURCE_WEBSITE.to_string(),
            event_source_url: raw.event_source_url.and_then(non_empty),
            click_id: raw.click_id.and_then(non_empty),
            user_data,
            custom_data: raw.custom_data.and_then(RawCustomData::normalize),
        })
    }

    pub fn products(&self) -> Vec<Product> {
        self.custom_data
            .as_ref()
            .map(CustomData::products)
            .unwrap_or_default()
    }

    pub fn event_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.event_time, 0).unwrap_or_else(Utc::now)
    }
}

/// Decode a raw request body. Anything that is not a JSON object is
/// rejected before any other validation runs.
pub fn parse_body(bytes: &[u8]) -> RelayResult<Value> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(body @ Value::Object(_)) => Ok(body),
        _ => Err(RelayError::Validation("Invalid JSON".into())),
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

// ─── Boundary decoding ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawEventBody {
    #[serde(default)]
    event_time: Option<Value>,
    #[serde(default)]
    event_id: Option<StringOrNumber>,
    #[serde(default)]
    event_source_url: Option<String>,
    #[serde(default)]
    click_id: Option<String>,
    #[serde(default)]
    user_data: Option<RawUserData>,
    #[serde(default)]
    custom_data: Option<RawCustomData>,
}

#[derive(Debug, Default, Deserialize)]
struct RawUserData {
    #[serde(default)]
    client_user_agent: Option<String>,
    #[serde(default)]
    em: Option<OneOrMany>,
    #[serde(default)]
    ph: Option<OneOrMany>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    fbc: Option<String>,
    #[serde(default)]
    fbp: Option<String>,
    #[serde(default)]
    ttclid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCustomData {
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    content_ids: Vec<StringOrNumber>,
    #[serde(default)]
    content_names: Vec<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::Text(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

/// Zero or one digest, whichever shape the caller used.
fn hashed_identifier(given: Option<OneOrMany>, plaintext: Option<&str>) -> Vec<String> {
    let first = match given {
        Some(OneOrMany::One(value)) => Some(value),
        Some(OneOrMany::Many(values)) => values.into_iter().find(|v| !v.trim().is_empty()),
        None => None,
    };
    first
        .filter(|v| !v.trim().is_empty())
        .or_else(|| plaintext.map(str::to_string))
        .filter(|v| !v.trim().is_empty())
        .map(|v| vec![ensure_hashed(&v)])
        .unwrap_or_default()
}

impl RawUserData {
    fn normalize(self) -> UserData {
        let email = self.email.and_then(non_empty);
        let phone = self.phone.and_then(non_empty);
        UserData {
            client_ip_address: String::new(),
            client_user_agent: self.client_user_agent.and_then(non_empty),
            em: hashed_identifier(self.em, email.as_deref()),
            ph: hashed_identifier(self.ph, phone.as_deref()),
            fbc: self.fbc.and_then(non_empty),
            fbp: self.fbp.and_then(non_empty),
            ttclid: self.ttclid.and_then(non_empty),
            email,
            phone,
        }
    }
}

impl RawCustomData {
    /// `None` when the caller sent an empty object.
    fn normalize(self) -> Option<CustomData> {
        let content_type = self.content_type.and_then(non_empty);
        let currency = self.currency.and_then(non_empty);
        if content_type.is_none()
            && self.content_ids.is_empty()
            && self.content_names.is_empty()
            && currency.is_none()
            && self.value.is_none()
        {
            return None;
        }

        let currency = match (currency, self.value) {
            (None, Some(_)) => Some(DEFAULT_CURRENCY.to_string()),
            (currency, _) => currency,
        };

        Some(CustomData {
            content_type: content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            content_ids: self
                .content_ids
                .into_iter()
                .map(StringOrNumber::into_string)
                .collect(),
            content_names: self.content_names,
            currency,
            value: self.value,
        })
    }
}
