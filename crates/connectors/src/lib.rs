pub mod bigquery;
pub mod error;
pub mod memory;
pub mod warehouse;
