pub mod http;

pub use http::HttpFetcher;

use crate::error::Result;
use std::future::Future;

/// Source of rendered page HTML
pub trait HtmlFetcher {
    /// Fetch the HTML served at `url`, failing on non-success responses
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}
