use reqwest::{header::HeaderMap, header::HeaderValue, Client};
use url::Url;

use super::error::ApiError;
use super::ApiRequest;

/// HTTP client for a running daemon. Every endpoint is a GET and answers
/// JSON when asked for it, so the Accept header is set once here.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(default_headers).build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    /// Send one request and decode its JSON response. Non-2xx answers come
    /// back as `ApiError::HttpStatus` with the body text preserved.
    pub async fn call<T: ApiRequest>(&mut self, request: T) -> Result<T::Response, ApiError> {
        let response = request
            .build_request(&self.remote, &self.client)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus(status, response.text().await?));
        }
        Ok(response.json::<T::Response>().await?)
    }

    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Underlying HTTP client, for endpoints without an `ApiRequest` type.
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}
