pub mod config;
pub mod error;
pub mod event;
pub mod hashing;
pub mod money;

pub use config::AppConfig;
pub use error::{RelayError, RelayResult};
pub use event::{CanonicalEvent, CustomData, EventName, Product, RequestMeta, UserData};
