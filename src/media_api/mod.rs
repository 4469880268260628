mod client;

pub use client::{ApiMediaFetcher, MediaApiClient};
