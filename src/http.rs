//! The authenticated HTTP session and the archive operations the rest of the crate is written against
use crate::error::{ConfigError, FetchError, ListingError};
use crate::request::{Credentials, GranuleRequest};
use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, LOCATION};
use reqwest::{redirect, Client, Method, Proxy, RequestBuilder, Response, StatusCode};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// NASA Earthdata login, where the LP DAAC and NSIDC pools send unauthenticated requests.
pub const EARTHDATA_LOGIN_HOST: &str = "urs.earthdata.nasa.gov";

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub body: String,
}

pub trait ArchiveOps {
    async fn get_page(self: &Self, url: &Url) -> Result<Page, ListingError>;

    /// Size advertised by the server for `url`, if it sends one.
    async fn content_length(self: &Self, url: &Url) -> Result<Option<u64>, FetchError>;

    /// Stream `url` into `dst`, truncating whatever is there. Returns the bytes written.
    async fn download(self: &Self, url: &Url, dst: &Path) -> Result<u64, FetchError>;
}

/// One client for the whole run. Redirects are followed by hand; credentials go to
/// the archive host and to the login host, never anywhere else.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
    credentials: Option<Credentials>,
    login_host: String,
}

impl HttpSession {
    pub fn new(request: &GranuleRequest) -> Result<Self, ConfigError> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .redirect(redirect::Policy::none());

        if let Some(proxy) = &request.proxy {
            let proxy = Proxy::all(proxy.as_str())
                .map_err(|e| ConfigError::InvalidUrl(proxy.to_string(), e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            credentials: request.credentials.clone(),
            login_host: EARTHDATA_LOGIN_HOST.to_string(),
        })
    }

    /// Send credentials to another login host instead of Earthdata.
    pub fn with_login_host(mut self: Self, host: impl Into<String>) -> Self {
        self.login_host = host.into();
        self
    }

    fn authorized(self: &Self, builder: RequestBuilder, target: &Url, origin: &Url) -> RequestBuilder {
        let trusted = target.host_str() == origin.host_str()
            || target.host_str() == Some(self.login_host.as_str());
        match &self.credentials {
            Some(c) if trusted => builder.basic_auth(&c.username, Some(&c.password)),
            _ => builder,
        }
    }

    async fn send(self: &Self, method: Method, url: &Url) -> Result<Response, FetchError> {
        let network_error = |reason: String| FetchError::Network {
            url: url.to_string(),
            reason,
        };

        let mut target = url.clone();
        let mut redirects = 0;
        let response = loop {
            let builder = self.client.request(method.clone(), target.clone());
            let response = self
                .authorized(builder, &target, url)
                .send()
                .await
                .map_err(|e| network_error(e.to_string()))?;

            if !response.status().is_redirection() {
                break response;
            }
            if redirects == MAX_REDIRECTS {
                return Err(network_error(format!("more than {MAX_REDIRECTS} redirects")));
            }
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| network_error("redirect without a Location header".to_string()))?;
            target = target
                .join(location)
                .map_err(|e| network_error(format!("bad redirect to '{location}': {e}")))?;
            debug!("Redirected to {}", target);
            redirects += 1;
        };

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(FetchError::Unauthorized(url.to_string()))
            }
            status if !status.is_success() => Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
            _ => Ok(response),
        }
    }
}

impl ArchiveOps for HttpSession {
    async fn get_page(self: &Self, url: &Url) -> Result<Page, ListingError> {
        debug!("GET {}", url);
        let response = self
            .send(Method::GET, url)
            .await
            .map_err(|e| match e {
                FetchError::Unauthorized(url) => ListingError::Unauthorized(url),
                other => ListingError::Network {
                    url: url.to_string(),
                    reason: other.to_string(),
                },
            })?;

        let body = response.text().await.map_err(|e| ListingError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Page {
            url: url.to_string(),
            body,
        })
    }

    async fn content_length(self: &Self, url: &Url) -> Result<Option<u64>, FetchError> {
        debug!("HEAD {}", url);
        let response = self.send(Method::HEAD, url).await?;
        // Response::content_length() reflects the (empty) HEAD body, not the header.
        let size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        Ok(size)
    }

    async fn download(self: &Self, url: &Url, dst: &Path) -> Result<u64, FetchError> {
        let response = self.send(Method::GET, url).await?;

        let io_error = |e: std::io::Error| FetchError::Io(dst.to_owned(), e);
        let mut file = File::create(dst).await.map_err(io_error)?;
        let mut body = response.bytes_stream();

        let mut byte_count = 0_u64;
        while let Some(bytes) = body.next().await {
            let bytes = bytes.map_err(|e| FetchError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            file.write_all(&bytes).await.map_err(io_error)?;
            byte_count += bytes.len() as u64;
        }
        file.flush().await.map_err(io_error)?;

        Ok(byte_count)
    }
}
