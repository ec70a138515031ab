//! Destination layer. Reshapes canonical events for each conversion API
//! and dispatches them.

pub mod adapters;
pub mod outcome;
pub mod router;
pub mod sender;

pub use adapters::{Destination, Platform};
pub use outcome::DispatchOutcome;
pub use router::{DestinationRouter, DispatchReport};
pub use sender::HttpSender;
