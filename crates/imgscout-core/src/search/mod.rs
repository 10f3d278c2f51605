//! Image search providers.
//!
//! Each provider turns a product query into an ordered list of candidate
//! image URLs. Failures never escape: a provider that errors returns an
//! empty list and logs why.

pub mod bing;
pub mod duckduckgo;
pub mod google;
pub mod openverse;
pub mod provider;
pub mod retry;

pub use bing::BingProvider;
pub use duckduckgo::DuckDuckGoProvider;
pub use google::GoogleProvider;
pub use openverse::OpenverseProvider;
pub use provider::{http_client, ImageSearchProvider, ProviderFactory};
