pub mod model;
pub mod provider;

pub use model::{Identity, Session};
pub use provider::IdentityProvider;
