//! Shared HTTP plumbing for the service clients.
//!
//! One [`Transport`] binds a base URL, a signer, and a reqwest client with a
//! fixed connect/read timeout pair. There is no retry at this layer — every
//! failure propagates to the caller on the first attempt.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::signer::Signer;

pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);
/// Chat-style calls can stream for minutes before the first byte arrives.
pub(crate) const CHAT_READ_TIMEOUT: Duration = Duration::from_secs(240);

const NEXT_PAGE_HEADER: &str = "opc-next-page";

/// One service endpoint plus the state shared by all its calls.
pub(crate) struct Transport {
    http: reqwest::Client,
    base_url: String,
    signer: Arc<dyn Signer>,
}

impl Transport {
    pub(crate) fn new(
        base_url: impl Into<String>,
        signer: Arc<dyn Signer>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .user_agent(concat!("ocikit/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            signer,
        })
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let resp = self.send(Method::GET, path, query, None).await?;
        decode(resp).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ClientError> {
        let resp = self.send(Method::POST, path, &[], Some(body)).await?;
        decode(resp).await
    }

    pub(crate) async fn post_ignore_body(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<(), ClientError> {
        self.send(Method::POST, path, &[], Some(body)).await?;
        Ok(())
    }

    pub(crate) async fn put_ignore_body(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<(), ClientError> {
        self.send(Method::PUT, path, &[], Some(body)).await?;
        Ok(())
    }

    /// Fetch every page of a list endpoint, following the pagination token
    /// until the service stops returning one.
    pub(crate) async fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ClientError> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut q: Vec<(&str, String)> = query.to_vec();
            if let Some(t) = token.take() {
                q.push(("page", t));
            }
            let resp = self.send(Method::GET, path, &q, None).await?;
            let next = next_page_token(&resp);
            let page_items: Vec<T> = decode(resp).await?;
            items.extend(page_items);
            match next {
                Some(n) => token = Some(n),
                None => break,
            }
        }
        Ok(items)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let mut req = self.http.request(method.clone(), &url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(b) = body {
            req = req.json(b);
        }
        req = self.signer.sign(req);

        tracing::debug!(%method, %url, "sending request");
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        tracing::warn!(%method, %url, status = status.as_u16(), "request failed");
        Err(api_error(status, resp).await)
    }
}

/// One page of a list response.
pub(crate) struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

/// Drive `fetch` from no token through every continuation token it returns.
/// A failure on any page aborts the whole listing.
pub(crate) async fn drain_pages<T, F>(mut fetch: F) -> Result<Vec<T>, ClientError>
where
    F: AsyncFnMut(Option<String>) -> Result<Page<T>, ClientError>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = fetch(token.take()).await?;
        items.extend(page.items);
        match page.next {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    Ok(items)
}

fn next_page_token(resp: &Response) -> Option<String> {
    resp.headers()
        .get(NEXT_PAGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let text = resp.text().await?;
    if text.is_empty() {
        return serde_json::from_str("{}").map_err(ClientError::Json);
    }
    serde_json::from_str(&text).map_err(ClientError::Json)
}

#[derive(serde::Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

async fn api_error(status: StatusCode, resp: Response) -> ClientError {
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .ok()
        .and_then(|body| match (body.code, body.message) {
            (Some(code), Some(msg)) => Some(format!("{code}: {msg}")),
            (None, Some(msg)) => Some(msg),
            _ => None,
        })
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}
