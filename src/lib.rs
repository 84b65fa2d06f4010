pub mod config;
pub mod envelope;
pub mod error;
pub mod logger;

pub use envelope::{Envelope, Header, Message};
