//! Network utilities for HTTP operations against the statistics index.

mod client;

pub use client::HttpClient;
