pub mod error;
pub mod metrics;
pub mod source;
pub mod state;
