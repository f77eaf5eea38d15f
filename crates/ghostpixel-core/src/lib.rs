//! Domain models and seams of the GhostPixel synchronization engine.

pub mod completion;
pub mod config;
pub mod error;
pub mod message;
pub mod prompt;
pub mod session;
pub mod state;
pub mod store;
pub mod subscription;
pub mod timestamp;
pub mod ui;
pub mod workspace;

pub use error::{GhostError, Result};
pub use subscription::{StopHandle, Subscription, SubscriptionSink};
pub use timestamp::StoreTimestamp;
