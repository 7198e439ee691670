//! HTTP transport implementation using `reqwest`.

use arcade_protocol::{Endpoint, Method};
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;

use crate::{ApiRequest, RawResponse, Transport, TransportError};

/// Talks to a live hypervisor over HTTP.
///
/// The base URL is fixed for the lifetime of the transport. Endpoint
/// paths are appended to its path, so a hypervisor behind a prefix
/// (`http://gw/hypervisor`) is reached at `http://gw/hypervisor/api/...`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Creates a transport for the hypervisor at `base_url`
    /// (e.g. `http://localhost:8083`).
    ///
    /// # Errors
    /// Returns [`TransportError::Unavailable`] if the URL can't be parsed
    /// or can't serve as a base, or if the HTTP client can't be built.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            TransportError::Unavailable(format!("invalid base url {base_url}: {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::Unavailable(format!(
                "base url {base_url} cannot carry a path"
            )));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Unavailable(format!("http client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> Url {
        let mut url = self.base_url.clone();
        let path = format!("{}{}", url.path().trim_end_matches('/'), endpoint.path());
        url.set_path(&path);
        url
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let url = self.url(request.endpoint);
        let method = match request.endpoint.method() {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.as_str());
        }
        if let Some(pool_id) = &request.pool_id {
            builder = builder.query(&[("pool_id", pool_id)]);
        }
        // POSTs always carry a JSON object, `{}` when there's nothing to say.
        let body = match (&request.body, request.endpoint.method()) {
            (Some(body), _) => Some(body.clone()),
            (None, Method::Post) => Some(b"{}".to_vec()),
            (None, Method::Get) => None,
        };
        if let Some(body) = body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::Unavailable(e.to_string())
            } else {
                TransportError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(format!("reading body: {e}")))?;

        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_owned(),
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_unparseable_url() {
        let err = HttpTransport::new("not a url").expect_err("should fail");
        assert!(matches!(err, TransportError::Unavailable(_)));
    }

    #[test]
    fn test_new_rejects_non_base_url() {
        let err = HttpTransport::new("mailto:ops@example.com").expect_err("should fail");
        assert!(matches!(err, TransportError::Unavailable(_)));
    }

    #[test]
    fn test_url_joins_endpoint_path() {
        let transport = HttpTransport::new("http://localhost:8083").unwrap();
        let url = transport.url(Endpoint::ReportScore);
        assert_eq!(url.as_str(), "http://localhost:8083/api/player/report-score");
    }

    #[test]
    fn test_url_keeps_base_path_prefix() {
        let transport = HttpTransport::new("http://hv.example:8083/hypervisor").unwrap();
        assert_eq!(
            transport.url(Endpoint::ServerStatus).as_str(),
            "http://hv.example:8083/hypervisor/api/server"
        );

        let trailing = HttpTransport::new("http://hv.example:8083/hypervisor/").unwrap();
        assert_eq!(
            trailing.url(Endpoint::ServerStatus).as_str(),
            "http://hv.example:8083/hypervisor/api/server"
        );
    }
}
