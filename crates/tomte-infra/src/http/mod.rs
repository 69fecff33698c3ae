//! HTTP adapters: the reply transport and the reference-data fetcher.

pub mod client;
pub mod reference;
pub mod streaming;
pub mod types;

pub use client::HttpReplyTransport;
pub use reference::HttpReference;
