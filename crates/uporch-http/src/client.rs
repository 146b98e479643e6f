//! reqwest client shared by every endpoint

use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use uporch_core::{ClientConfig, ProjectId, TransportError, UpgradeApi, UpgradeRequest, UpgradeStatusResponse};

/// Authenticated client for one API base URL
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpClient {
    /// Build a client from configuration
    ///
    /// # Errors
    /// `TransportError::Request` when the base URL does not parse or the
    /// underlying client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let base = Url::parse(config.base_url()).map_err(|e| {
            TransportError::Request(format!("invalid API URL '{}': {e}", config.api_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(TransportError::Request(format!(
                "invalid API URL '{}': cannot be a base",
                config.api_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            token: config.token.clone(),
        })
    }

    /// Resolve path segments against the base; segments are percent-encoded
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and turn non-2xx answers into `TransportError::Status`
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response, TransportError> {
        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        tracing::debug!(url = %response.url(), status = status.as_u16(), "response received");

        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::status(status.as_u16(), body))
    }

    /// Send and decode the JSON body; an empty body decodes as `T::default()`
    pub(crate) async fn send_json<T>(&self, builder: RequestBuilder) -> Result<T, TransportError>
    where
        T: DeserializeOwned + Default,
    {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}

#[async_trait::async_trait]
impl UpgradeApi for HttpClient {
    async fn upgrade_status(
        &self,
        project_id: &ProjectId,
    ) -> Result<UpgradeStatusResponse, TransportError> {
        let url = self.endpoint(&["api", "v2", "workspace", project_id.as_str(), "upgrade", "status"]);
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn start_upgrade(&self, request: &UpgradeRequest) -> Result<(), TransportError> {
        let url = self.endpoint(&["api", "v2", "workspace", request.project_id.as_str(), "upgrade"]);
        self.send(self.request(Method::POST, url).json(request)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_url: &str) -> HttpClient {
        HttpClient::new(&ClientConfig::new().with_api_url(api_url)).unwrap()
    }

    #[test]
    fn endpoint_appends_to_base_path() {
        let client = client("https://api.example.com/prefix/");
        let url = client.endpoint(&["api", "v2", "workspace", "p 1", "upgrade"]);
        assert_eq!(
            url.as_str(),
            "https://api.example.com/prefix/api/v2/workspace/p%201/upgrade"
        );
    }

    #[test]
    fn endpoint_on_bare_host() {
        let client = client("http://localhost:8080");
        let url = client.endpoint(&["api", "v1", "secret-approvals"]);
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/secret-approvals");
    }

    #[test]
    fn rejects_unparseable_base() {
        let err = HttpClient::new(&ClientConfig::new().with_api_url("not a url")).unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }
}
