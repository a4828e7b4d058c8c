use crate::error::{classify_transport, Error};
use crate::models::{OcsResponse, ServerStatus};
use crate::session::SessionContext;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use url::Url;

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed path prefix of the provisioning API, appended to the session's
/// base URL.
const API_PREFIX: [&str; 3] = ["ocs", "v2.php", "cloud"];

/// Header marking programmatic calls for the remote API.
const API_REQUEST_MARKER: &str = "OCS-APIRequest";

/// Builder for [`ProvisioningClient`].
pub struct ProvisioningClientBuilder {
    session: SessionContext,
    timeout: Duration,
}

impl ProvisioningClientBuilder {
    pub fn new(session: SessionContext) -> Self {
        Self {
            session,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the request timeout for the underlying HTTP client.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client from the configured options.
    ///
    /// The certificate-trust downgrade is applied here, from the session
    /// context alone: a new session means a new client and a fresh trust
    /// decision.
    pub fn build(self) -> Result<ProvisioningClient, Error> {
        let api_base = build_url(self.session.base_url(), &API_PREFIX)?;
        let status_url = build_url(self.session.base_url(), &["status.php"])?;
        let http = HttpClient::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.session.allow_self_signed())
            .build()
            .map_err(classify_transport)?;
        Ok(ProvisioningClient {
            http,
            api_base,
            status_url,
            session: self.session,
        })
    }
}

/// Async client for the provisioning API.
///
/// Turns each logical operation into one authenticated HTTP exchange and
/// maps the raw outcome into a typed result or [`Error`].
pub struct ProvisioningClient {
    http: HttpClient,
    api_base: Url,
    status_url: Url,
    session: SessionContext,
}

impl ProvisioningClient {
    /// Returns a builder for the provided session context.
    pub fn builder(session: SessionContext) -> ProvisioningClientBuilder {
        ProvisioningClientBuilder::new(session)
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub(crate) fn build_url(&self, segments: &[&str]) -> Result<Url, Error> {
        build_url(&self.api_base, segments)
    }

    /// Starts a request carrying Basic auth, the JSON accept header, and
    /// the programmatic-call marker.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(self.session.username(), Some(self.session.password()))
            .header(ACCEPT, "application/json")
            .header(API_REQUEST_MARKER, "true")
    }

    /// Unwraps the two-level envelope after status-code checks pass.
    ///
    /// 401 always maps to `Unauthorized`, independent of body content and
    /// ahead of every other mapping; any other non-200 carries the status
    /// and raw body; decoding is attempted only on a 200.
    pub(crate) async fn expect_envelope<T: serde::de::DeserializeOwned>(
        &self,
        resp: Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }
        let body = resp.text().await.map_err(classify_transport)?;
        if status != StatusCode::OK {
            return Err(Error::ServerRejected {
                status: status.as_u16(),
                body,
            });
        }
        let envelope = serde_json::from_str::<OcsResponse<T>>(&body)?;
        Ok(envelope.ocs.data)
    }

    pub(crate) async fn send(&self, req: RequestBuilder) -> Result<Response, Error> {
        req.send().await.map_err(classify_transport)
    }

    /// Probes the server's public status endpoint. No authentication and no
    /// envelope; useful as a pre-login connectivity check.
    pub async fn server_status(&self) -> Result<ServerStatus, Error> {
        let resp = self
            .http
            .get(self.status_url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(classify_transport)?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }
        let body = resp.text().await.map_err(classify_transport)?;
        if status != StatusCode::OK {
            return Err(Error::ServerRejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Form-encoded mutation body; also forces the `Content-Type` header on
/// bodiless mutations.
pub(crate) fn form_body(req: RequestBuilder, params: &[(&str, &str)]) -> RequestBuilder {
    if params.is_empty() {
        req.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(String::new())
    } else {
        req.form(params)
    }
}

fn build_url(base: &Url, segments: &[&str]) -> Result<Url, Error> {
    let mut url = base.clone();
    {
        let mut path_segments = url
            .path_segments_mut()
            .map_err(|_| Error::InvalidEndpoint(base.to_string()))?;
        path_segments.pop_if_empty();
        for segment in segments {
            path_segments.push(segment);
        }
    }
    Ok(url)
}
