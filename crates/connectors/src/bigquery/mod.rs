//! BigQuery REST v2 client.

pub mod auth;
pub mod client;
pub mod convert;
pub mod models;
pub mod stream;

pub use client::{BigQueryClient, BigQueryOptions};
