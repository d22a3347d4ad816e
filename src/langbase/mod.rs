//! Langbase Pipes client.
//!
//! Thin HTTP client over the Langbase `pipes/run` and `pipes` endpoints.
//! The garden narrator is built on top of it.

mod client;
mod types;


pub use client::LangbaseClient;
pub use types::*;
