pub mod model;

pub use model::{Message, MessageRole};
