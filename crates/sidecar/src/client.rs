//! HTTP plumbing shared by every sidecar call

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{SidecarConfig, SidecarError, API_TOKEN_HEADER};

/// Client for the sidecar's HTTP API
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct SidecarClient {
    http: reqwest::Client,
    config: SidecarConfig,
}

impl SidecarClient {
    pub fn new(config: SidecarConfig) -> Result<Self, SidecarError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SidecarConfig {
        &self.config
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.endpoint, path);
        debug!(%method, %url, "sidecar request");

        let builder = self.http.request(method, url);
        match &self.config.api_token {
            Some(token) => builder.header(API_TOKEN_HEADER, token),
            None => builder,
        }
    }

    /// Send a request and return the body of a successful response
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Vec<u8>, SidecarError> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SidecarError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, SidecarError> {
        let body = self.send(builder).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
