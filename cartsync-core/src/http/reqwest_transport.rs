//! HTTP transport backed by `reqwest`.

use futures_util::future::BoxFuture;
use url::Url;

use super::{Method, Request, Response, Transport};
use crate::error::TransportError;

/// Sends requests to a storefront origin. Relative request urls are resolved
/// against `base`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base: Url,
}

impl ReqwestTransport {
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, base: Url) -> Self {
        Self { client, base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>> {
        Box::pin(async move {
            let target = self
                .base
                .join(&request.url)
                .map_err(|source| TransportError::InvalidUrl {
                    url: request.url.clone(),
                    source,
                })?;

            let mut builder = self.client.request(Self::method(request.method), target);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let http_error = |source| TransportError::Http {
                url: request.url.clone(),
                source,
            };
            let response = builder.send().await.map_err(http_error)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(http_error)?;

            tracing::trace!(url = %request.url, status, "http response");
            Ok(Response::new(request.url.clone(), status, body))
        })
    }
}
