mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

/// One callable server operation, from the client's point of view: how to
/// build the HTTP request, and what the response body decodes to.
pub trait ApiRequest {
    type Response: DeserializeOwned;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder;
}
