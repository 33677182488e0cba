//! HTTP client for CalDAV operations.
//!
//! Wraps `reqwest` with the WebDAV verbs the store needs and answers
//! `401` challenges once per request with Basic or Digest credentials.

use std::sync::Mutex;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, WWW_AUTHENTICATE};
use reqwest::{Client, Method, Response, StatusCode};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};

use super::auth::{Challenge, Credentials};
use super::config::CalDavConfig;

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
const ICS_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// One outbound WebDAV request.
struct DavRequest<'a> {
    method: Method,
    url: &'a Url,
    body: Option<(&'a str, &'static str)>,
    headers: HeaderMap,
}

impl<'a> DavRequest<'a> {
    fn new(method: Method, url: &'a Url) -> Self {
        Self {
            method,
            url,
            body: None,
            headers: HeaderMap::new(),
        }
    }

    fn xml(mut self, body: &'a str) -> Self {
        self.body = Some((body, XML_CONTENT_TYPE));
        self
    }

    fn calendar(mut self, body: &'a str) -> Self {
        self.body = Some((body, ICS_CONTENT_TYPE));
        self
    }

    fn header(mut self, name: &'static str, value: &str) -> ProviderResult<Self> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| ProviderError::internal(format!("Invalid {name} header: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Path and query, as Digest auth signs them.
    fn request_uri(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }
}

/// HTTP client for CalDAV operations.
///
/// Safe to share between concurrent requests; only the last authentication
/// challenge is shared state.
pub struct CalDavClient {
    client: Client,
    credentials: Option<Credentials>,
    challenge: Mutex<Option<Challenge>>,
}

impl CalDavClient {
    pub fn new(config: &CalDavConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("Failed to create HTTP client: {e}"))
                    .with_source(e)
            })?;

        let credentials = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => Some(Credentials::new(user, pass)),
            _ => None,
        };

        Ok(Self {
            client,
            credentials,
            challenge: Mutex::new(None),
        })
    }

    /// PROPFIND with the given depth; returns the multistatus body.
    pub async fn propfind(&self, url: &Url, body: &str, depth: u8) -> ProviderResult<String> {
        let request = DavRequest::new(dav_method("PROPFIND")?, url)
            .xml(body)
            .header("Depth", &depth.to_string())?;
        self.execute(request).await
    }

    /// REPORT (calendar-query) on a collection; returns the multistatus body.
    pub async fn report(&self, url: &Url, body: &str) -> ProviderResult<String> {
        let request = DavRequest::new(dav_method("REPORT")?, url)
            .xml(body)
            .header("Depth", "1")?;
        self.execute(request).await
    }

    /// PUT a new calendar object; fails if one already exists at `url`.
    pub async fn put_new(&self, url: &Url, ics: &str) -> ProviderResult<()> {
        let request = DavRequest::new(Method::PUT, url)
            .calendar(ics)
            .header("If-None-Match", "*")?;
        self.execute(request).await.map(|_| ())
    }

    /// DELETE a calendar object, guarded by its ETag when known.
    pub async fn delete(&self, url: &Url, etag: Option<&str>) -> ProviderResult<()> {
        let mut request = DavRequest::new(Method::DELETE, url);
        if let Some(etag) = etag {
            request = request.header("If-Match", etag)?;
        }
        self.execute(request).await.map(|_| ())
    }

    /// Sends the request, answering one `401` challenge if needed.
    async fn execute(&self, request: DavRequest<'_>) -> ProviderResult<String> {
        let response = self.send(&request, self.cached_authorization(&request)).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return self.handle_response(&request, response).await;
        }

        let Some(credentials) = self.credentials.as_ref() else {
            return Err(ProviderError::authentication(
                "Server requires authentication but no credentials are configured",
            ));
        };

        let challenge = response
            .headers()
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(Challenge::parse)
            .max_by_key(|c| matches!(c, Challenge::Digest(_)))
            .unwrap_or(Challenge::Basic);

        debug!(
            method = %request.method,
            scheme = if matches!(challenge, Challenge::Digest(_)) { "digest" } else { "basic" },
            "Received 401, retrying with credentials"
        );

        let authorization = {
            let mut cached = self
                .challenge
                .lock()
                .map_err(|_| ProviderError::internal("authentication state poisoned"))?;
            let challenge = cached.insert(challenge);
            challenge.authorize(
                credentials,
                request.method.as_str(),
                &request.request_uri(),
            )
        };

        let response = self.send(&request, Some(authorization)).await?;
        self.handle_response(&request, response).await
    }

    /// Authorization for the first attempt, from the last challenge seen.
    fn cached_authorization(&self, request: &DavRequest<'_>) -> Option<String> {
        let credentials = self.credentials.as_ref()?;
        let mut cached = self.challenge.lock().ok()?;
        let challenge = cached.as_mut()?;
        Some(challenge.authorize(credentials, request.method.as_str(), &request.request_uri()))
    }

    async fn send(
        &self,
        request: &DavRequest<'_>,
        authorization: Option<String>,
    ) -> ProviderResult<Response> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some((body, content_type)) = request.body {
            builder = builder
                .header(CONTENT_TYPE, content_type)
                .body(body.to_string());
        }
        if let Some(authorization) = authorization {
            builder = builder.header(reqwest::header::AUTHORIZATION, authorization);
        }

        trace!(method = %request.method, url = %request.url, "Sending request");

        builder.send().await.map_err(|e| {
            ProviderError::network(format!("{} {} failed: {e}", request.method, request.url))
                .with_source(e)
        })
    }

    async fn handle_response(
        &self,
        request: &DavRequest<'_>,
        response: Response,
    ) -> ProviderResult<String> {
        let status = response.status();
        trace!(status = %status, url = %request.url, "Received response");

        if matches!(
            status,
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT | StatusCode::MULTI_STATUS
        ) {
            return response.text().await.map_err(|e| {
                ProviderError::network(format!("Failed to read response: {e}")).with_source(e)
            });
        }

        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        if status.is_server_error() || status.is_client_error() {
            debug!(status = %status, body = %snippet, "Request rejected");
        } else {
            warn!(status = %status, body = %snippet, "Unexpected response status");
        }

        Err(ProviderError::from_status(
            status.as_u16(),
            format!("{} {} returned {status}", request.method, request.url),
        ))
    }
}

fn dav_method(name: &str) -> ProviderResult<Method> {
    Method::from_bytes(name.as_bytes())
        .map_err(|_| ProviderError::internal(format!("Invalid HTTP method: {name}")))
}
