// src/http/mod.rs
//
// HTTP transport used to fire replayed requests

pub mod client;

pub use client::{HttpClientConfig, HttpTransport};
