// xats-net/src/lib.rs
pub mod http;
pub mod validation;

pub use http::{Fetcher, HttpFetcher};
pub use validation::{validate_url, verify_fetched};
pub use xats_common::error::{Result, XatsError};
