//! Typed HTTP calls against the Kubernetes REST API.
//!
//! Every call performs exactly one round trip, reads the full body and maps
//! failures onto [`KubeError`]. There is no retry at this layer.

use std::future::Future;
use std::time::Duration;

use error_stack::Report;
use error_stack::ResultExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use reqwest::RequestBuilder;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::config::API_ENDPOINT;
use crate::error::KubeError;
use crate::error::KubeResult;

/// HTTP client for resource endpoints under `<server>/api/v1`.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    http: reqwest::Client,
    api_root: String,
    request_timeout: Duration,
}

impl ResourceClient {
    /// Validate the configured server url and build a client on top of `http`.
    ///
    /// # Errors
    ///
    /// - [`KubeError::Configuration`] if the server url cannot be parsed or is
    ///   not an `http`/`https` url
    pub fn new(config: &ClientConfig, http: reqwest::Client) -> KubeResult<Self> {
        let base = Url::parse(&config.server_url).change_context_lazy(|| {
            KubeError::configuration(format!("failed to parse URL {:?}", config.server_url))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Report::new(KubeError::configuration(format!(
                "unsupported URL scheme {:?} in {:?}",
                base.scheme(),
                config.server_url
            ))));
        }

        Ok(Self {
            http,
            api_root: format!("{}{API_ENDPOINT}", base.as_str().trim_end_matches('/')),
            request_timeout: config.request_timeout,
        })
    }

    /// Absolute url for a path below the API root.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_root, path)
    }

    /// POST `body` as JSON and decode the `201 Created` response.
    pub async fn create<B, T>(&self, path: &str, body: &B) -> KubeResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let payload = serde_json::to_vec(body).change_context_lazy(|| KubeError::Encoding {
            what: format!("request body for POST {url}"),
        })?;
        let request = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload);

        let body = self
            .round_trip(Method::POST, &url, request, &[StatusCode::CREATED])
            .await?;
        decode(&body, || format!("response body of POST {url}"))
    }

    /// GET a single resource.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> KubeResult<T> {
        let url = self.url(path);
        let request = self.http.get(&url);
        let body = self
            .round_trip(Method::GET, &url, request, &[StatusCode::OK])
            .await?;
        decode(&body, || format!("response body of GET {url}"))
    }

    /// GET a collection; `T` is the list wrapper, e.g. `List<Pod>`.
    pub async fn list<T: DeserializeOwned>(&self, path: &str) -> KubeResult<T> {
        let url = self.url(path);
        let request = self.http.get(&url);
        let body = self
            .round_trip(Method::GET, &url, request, &[StatusCode::OK])
            .await?;
        decode(&body, || format!("list returned by GET {url}"))
    }

    /// GET a plain text body, e.g. container logs.
    pub async fn get_text(&self, path: &str) -> KubeResult<String> {
        let url = self.url(path);
        let request = self.http.get(&url);
        let body = self
            .round_trip(Method::GET, &url, request, &[StatusCode::OK])
            .await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// DELETE a resource. The response body is ignored.
    ///
    /// `202 Accepted` counts as success: the server answers it when the
    /// deletion is graceful and still in progress.
    pub async fn delete(&self, path: &str) -> KubeResult<()> {
        let url = self.url(path);
        let request = self.http.delete(&url);
        self.round_trip(
            Method::DELETE,
            &url,
            request,
            &[StatusCode::OK, StatusCode::ACCEPTED],
        )
        .await?;
        Ok(())
    }

    /// GET a streaming endpoint and hand back the live response once the
    /// status line says `200 OK`.
    ///
    /// No total timeout is applied: the body is expected to stay open until
    /// the caller drops it.
    pub async fn open_stream(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> KubeResult<reqwest::Response> {
        let url = self.url(path);
        debug!(method = %Method::GET, url = %url, "opening stream");

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .change_context_lazy(|| {
                KubeError::transport(format!("failed to make request: GET {url}"))
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            // A broken body must not hide the status.
            let (body, read_failure) = match response.text().await {
                Ok(body) => (body, None),
                Err(err) => (String::new(), Some(err)),
            };
            let mut report = Report::new(KubeError::Api {
                status: status.as_u16(),
                body,
            })
            .attach_printable(format!("GET {url}"));
            if let Some(err) = read_failure {
                report = report.attach_printable(format!("failed to read response body: {err}"));
            }
            return Err(report);
        }
        Ok(response)
    }

    async fn round_trip(
        &self,
        method: Method,
        url: &str,
        request: RequestBuilder,
        expected: &[StatusCode],
    ) -> KubeResult<Vec<u8>> {
        debug!(method = %method, url = %url, "sending request");

        let response = request
            .timeout(self.request_timeout)
            .send()
            .await
            .change_context_lazy(|| {
                KubeError::transport(format!("failed to make request: {method} {url}"))
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .change_context_lazy(|| KubeError::Read {
                message: format!("{method} {url}"),
            })?;

        if !expected.contains(&status) {
            return Err(Report::new(KubeError::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            })
            .attach_printable(format!("{method} {url}")));
        }

        Ok(body.to_vec())
    }
}

fn decode<T: DeserializeOwned>(body: &[u8], what: impl FnOnce() -> String) -> KubeResult<T> {
    serde_json::from_slice(body).change_context_lazy(|| KubeError::Decoding { what: what() })
}

/// Race `call` against `cancel`; cancellation wins when both are ready.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    call: impl Future<Output = KubeResult<T>>,
) -> KubeResult<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Report::new(KubeError::Cancelled)),
        result = call => result,
    }
}
