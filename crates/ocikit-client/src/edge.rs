//! Client factory for roving-edge appliance deployments.
//!
//! An edge appliance serves each control-plane API on its own port of a
//! single host, fronted by a locally issued certificate chain. The builder
//! takes every parameter up front and produces an immutable handle bound to
//! one service endpoint with the appliance CA bundle installed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::signer::Signer;
use crate::transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};

/// Host name an appliance console answers on unless overridden.
pub const DEFAULT_EDGE_HOST: &str = "otec-console-local";

/// Services exposed by an edge appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeService {
    ObjectStorage,
    Identity,
    Compute,
    BlockStorage,
    VirtualNetwork,
}

impl EdgeService {
    /// Port the appliance serves this API on.
    pub fn port(self) -> u16 {
        match self {
            Self::ObjectStorage => 8019,
            Self::Identity => 12050,
            Self::Compute => 19060,
            Self::BlockStorage => 5012,
            Self::VirtualNetwork => 18336,
        }
    }
}

impl std::str::FromStr for EdgeService {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "object_storage" => Ok(Self::ObjectStorage),
            "iam" | "identity" => Ok(Self::Identity),
            "compute" => Ok(Self::Compute),
            "storage" | "block_storage" => Ok(Self::BlockStorage),
            "network" | "virtual_network" => Ok(Self::VirtualNetwork),
            other => Err(ClientError::Config(format!(
                "{other} is not a valid edge service"
            ))),
        }
    }
}

/// Builder for [`EdgeClient`].
pub struct EdgeClientBuilder {
    service: EdgeService,
    host: String,
    cert_bundle: Option<PathBuf>,
    signer: Arc<dyn Signer>,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl EdgeClientBuilder {
    pub fn new(service: EdgeService, signer: Arc<dyn Signer>) -> Self {
        Self {
            service,
            host: DEFAULT_EDGE_HOST.to_owned(),
            cert_bundle: None,
            signer,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Appliance host name or IP address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// CA bundle to trust instead of `~/.oci/bundle.pem`.
    #[must_use]
    pub fn cert_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.cert_bundle = Some(path.into());
        self
    }

    #[must_use]
    pub fn timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    /// Construct the client handle.
    ///
    /// # Errors
    ///
    /// Fails if the CA bundle cannot be read or parsed, or if the HTTP
    /// client cannot be constructed.
    pub fn build(self) -> Result<EdgeClient, ClientError> {
        let bundle_path = match self.cert_bundle {
            Some(path) => path,
            None => default_cert_bundle()?,
        };
        let pem = std::fs::read(&bundle_path).map_err(|err| {
            ClientError::Config(format!(
                "failed to read cert bundle {}: {err}",
                bundle_path.display()
            ))
        })?;
        let certs = reqwest::Certificate::from_pem_bundle(&pem)?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.read_timeout)
            .user_agent(concat!("ocikit/", env!("CARGO_PKG_VERSION")));
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
        let http = builder.build()?;

        Ok(EdgeClient {
            http,
            base_url: format!("https://{}:{}", self.host, self.service.port()),
            service: self.service,
            signer: self.signer,
        })
    }
}

/// Immutable handle bound to one appliance service endpoint.
pub struct EdgeClient {
    http: reqwest::Client,
    base_url: String,
    service: EdgeService,
    signer: Arc<dyn Signer>,
}

impl std::fmt::Debug for EdgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeClient")
            .field("base_url", &self.base_url)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl EdgeClient {
    pub fn service(&self) -> EdgeService {
        self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A signed request builder for `path`, for callers driving the service
    /// API directly.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        self.signer.sign(self.http.request(method, url))
    }

    /// GET a JSON document from the service.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-success status.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self.request(Method::GET, path).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: if body.is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    body
                },
            });
        }
        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(ClientError::Json)
    }
}

fn default_cert_bundle() -> Result<PathBuf, ClientError> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| {
            ClientError::Config(
                "no cert bundle path given and the home directory is not set".to_owned(),
            )
        })?;
    Ok(PathBuf::from(home).join(".oci").join("bundle.pem"))
}
