use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use url::Url;

use crate::errors::{Result, SabnzbdError};
use crate::models::{
    AddUrlResponse, Completion, History, HistoryResponse, Queue, QueueResponse, VersionResponse,
    WaitOptions,
};
use crate::params::{AddUrlOptions, Endpoint, QueryParams};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "8080";
const API_PATH: &str = "sabnzbd/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const API_KEY_ENV: &str = "SABNZBD_API_KEY";

/// Builder for constructing a [`Client`] with custom configuration.
///
/// # Example
///
/// ```no_run
/// use sabnzbd::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> sabnzbd::Result<()> {
/// let client = ClientBuilder::new()
///     .host("nas.local")
///     .port("9090")
///     .api_key("6e961fd677a74326a07f1df4c06e3f38")
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    host: String,
    port: String,
    https: bool,
    base_url: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
}

impl ClientBuilder {
    /// Create a new builder pointing at `http://127.0.0.1:8080/sabnzbd/api`.
    pub fn new() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT.to_string(),
            https: false,
            base_url: None,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    /// Talk to the server over `https` instead of plain `http`.
    pub fn https(mut self, yes: bool) -> Self {
        self.https = yes;
        self
    }

    /// Use a complete API URL instead of `scheme://host:port/sabnzbd/api`,
    /// e.g. when SABnzbd sits behind a reverse proxy under another path.
    /// Host, port and scheme settings are ignored when this is set.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the HTTP request timeout (defaults to 60 seconds).
    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = d;
        self
    }

    /// Build the [`Client`].
    ///
    /// If no API key was set via [`api_key`](Self::api_key), the builder will
    /// attempt to read the `SABNZBD_API_KEY` environment variable.
    ///
    /// Returns [`SabnzbdError::Authentication`] if no key is available and
    /// [`SabnzbdError::InvalidUrl`] if the endpoint cannot be parsed.
    pub fn build(self) -> Result<Client> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .ok_or_else(|| SabnzbdError::Authentication {
                message: "API key is required. Pass it to ClientBuilder::api_key() \
                          or set the SABNZBD_API_KEY environment variable."
                    .into(),
            })?;

        let base = match self.base_url {
            Some(url) => Url::parse(url.trim_end_matches('/'))?,
            None => {
                let scheme = if self.https { "https" } else { "http" };
                Url::parse(&format!("{scheme}://{}:{}/{API_PATH}", self.host, self.port))?
            }
        };

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(SabnzbdError::Http)?;

        Ok(Client {
            endpoint: Endpoint::new(base, api_key),
            http,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Client for one SABnzbd instance.
///
/// Holds nothing but the resolved endpoint and a connection pool, so it can be
/// shared freely; concurrent calls are serialized only by the server.
///
/// # Example
///
/// ```no_run
/// use sabnzbd::{AddUrlOptions, Client};
///
/// # async fn example() -> sabnzbd::Result<()> {
/// let client = Client::new("127.0.0.1", "8080", "6e961fd677a74326a07f1df4c06e3f38")?;
///
/// let ids = client
///     .add_url_and_wait("https://example.com/file.nzb", None, None)
///     .await?;
/// println!("finished: {ids:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    endpoint: Endpoint,
    http: reqwest::Client,
}

impl Client {
    /// Create a client for `http://{host}:{port}/sabnzbd/api` with default
    /// settings. Use [`ClientBuilder`] for anything else.
    pub fn new(
        host: impl Into<String>,
        port: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        ClientBuilder::new()
            .host(host)
            .port(port)
            .api_key(api_key)
            .build()
    }

    /// The endpoint every request is built from.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Version of the running SABnzbd.
    pub async fn version(&self) -> Result<String> {
        let resp: VersionResponse = self.request("version", QueryParams::new()).await?;
        Ok(resp.version)
    }

    /// Add an NZB by URL and return the ids of the jobs the server created.
    ///
    /// Every option that is set is forwarded verbatim. The returned list is
    /// whatever the server sent, possibly empty.
    pub async fn add_url(&self, url: &str, opts: Option<&AddUrlOptions>) -> Result<Vec<String>> {
        let mut params = QueryParams::new().with("name", url);
        if let Some(opts) = opts {
            opts.apply(&mut params);
        }

        let resp: AddUrlResponse = self.request("addurl", params).await?;
        tracing::debug!("submitted {url}");
        tracing::info!(ids = ?resp.nzo_ids, "job submitted");
        Ok(resp.nzo_ids)
    }

    /// Current queue, filtered server-side to `ids`. An empty slice returns
    /// the full queue.
    pub async fn queue<S: AsRef<str>>(&self, ids: &[S]) -> Result<Queue> {
        let mut params = QueryParams::new();
        params.set_id_filter(ids);
        let resp: QueueResponse = self.request("queue", params).await?;
        Ok(resp.queue)
    }

    /// Current history, filtered server-side to `ids`. An empty slice returns
    /// the full history.
    pub async fn history<S: AsRef<str>>(&self, ids: &[S]) -> Result<History> {
        let mut params = QueryParams::new();
        params.set_id_filter(ids);
        let resp: HistoryResponse = self.request("history", params).await?;
        Ok(resp.history)
    }

    /// Check where `ids` stand.
    ///
    /// Any queue entry at all means the set is still [`Completion::Queued`].
    /// Otherwise the history decides: a `Failed` entry is an error, a
    /// non-terminal entry or an id missing from both snapshots is
    /// [`Completion::Processing`], and all `Completed` is
    /// [`Completion::Finished`].
    ///
    /// # Errors
    ///
    /// - [`SabnzbdError::NoJobIds`] if `ids` is empty.
    /// - [`SabnzbdError::DownloadFailed`] naming every failed id.
    pub async fn completion<S: AsRef<str>>(&self, ids: &[S]) -> Result<Completion> {
        if ids.is_empty() {
            return Err(SabnzbdError::NoJobIds);
        }

        let queue = self.queue(ids).await?;
        if !queue.slots.is_empty() {
            return Ok(Completion::Queued(queue));
        }

        let history = self.history(ids).await?;

        let failed: Vec<_> = history.slots.iter().filter(|s| s.is_failed()).collect();
        if let Some(first) = failed.first() {
            let message = if first.fail_message.is_empty() {
                "download failed".to_string()
            } else {
                first.fail_message.clone()
            };
            let ids: Vec<String> = failed.iter().map(|s| s.nzo_id.clone()).collect();
            tracing::warn!(?ids, "download failed: {message}");
            return Err(SabnzbdError::DownloadFailed { ids, message });
        }

        let all_present = ids
            .iter()
            .all(|id| history.slot(id.as_ref()).is_some());
        if !all_present || history.slots.iter().any(|s| !s.is_completed()) {
            return Ok(Completion::Processing(history));
        }

        Ok(Completion::Finished(history))
    }

    /// `true` once every job in `ids` completed successfully.
    ///
    /// See [`completion`](Self::completion) for the rules and errors.
    pub async fn is_download_finished<S: AsRef<str>>(&self, ids: &[S]) -> Result<bool> {
        Ok(self.completion(ids).await?.is_finished())
    }

    /// Poll until every job in `ids` completed, a job failed, or the
    /// timeout from `opts` elapsed.
    ///
    /// Dropping the returned future stops polling.
    ///
    /// # Errors
    ///
    /// - [`SabnzbdError::Timeout`] if polling exceeds the configured timeout.
    /// - [`SabnzbdError::DownloadFailed`] if a job reaches `Failed` status.
    pub async fn wait_until_finished<S: AsRef<str>>(
        &self,
        ids: &[S],
        opts: &WaitOptions,
    ) -> Result<History> {
        let deadline = Instant::now() + opts.timeout;
        let mut rounds: u64 = 0;

        loop {
            rounds += 1;
            let state = self.completion(ids).await?;

            if let Completion::Finished(history) = state {
                tracing::info!(rounds, "all jobs completed");
                return Ok(history);
            }

            tracing::trace!(rounds, queued = matches!(state, Completion::Queued(_)), "not finished");

            if let Some(ref cb) = opts.on_progress {
                cb(&state);
            }

            if Instant::now() >= deadline {
                tracing::warn!(rounds, "gave up waiting after {:?}", opts.timeout);
                return Err(SabnzbdError::Timeout(opts.timeout));
            }

            tokio::time::sleep(opts.poll_interval).await;
        }
    }

    /// Add an NZB by URL and poll until it finished downloading.
    ///
    /// Returns the submitted ids unchanged, in server order. Pass `None` for
    /// `wait` to poll every second for up to 24 hours.
    ///
    /// A job that disappears from both queue and history (deleted by the
    /// user, or pruned from history) is never reported as finished, so the
    /// wait only ends at the timeout. Set a shorter [`WaitOptions::timeout`]
    /// when that can happen.
    ///
    /// # Errors
    ///
    /// - [`SabnzbdError::NoJobIds`] if the server created no job.
    /// - [`SabnzbdError::Timeout`] if polling exceeds the configured timeout.
    /// - [`SabnzbdError::DownloadFailed`] if a job reaches `Failed` status.
    pub async fn add_url_and_wait(
        &self,
        url: &str,
        opts: Option<&AddUrlOptions>,
        wait: Option<WaitOptions>,
    ) -> Result<Vec<String>> {
        let ids = self.add_url(url, opts).await?;
        let wait = wait.unwrap_or_default();
        self.wait_until_finished(&ids, &wait).await?;
        Ok(ids)
    }

    /// Issue one raw API call and return the decoded JSON body.
    ///
    /// The query carries `apikey`, `output=json`, `mode` and then `params`,
    /// later keys overriding earlier ones. No retry is attempted.
    ///
    /// # Errors
    ///
    /// - [`SabnzbdError::Http`] for network faults.
    /// - [`SabnzbdError::Authentication`] / [`SabnzbdError::Api`] for
    ///   non-success statuses.
    /// - [`SabnzbdError::Decode`] if the body is not JSON.
    /// - [`SabnzbdError::Server`] if the body is `{"status": false, "error": ...}`.
    pub async fn call(&self, mode: &str, params: &QueryParams) -> Result<serde_json::Value> {
        let url = self.endpoint.url_for(mode, params);
        tracing::debug!(mode, path = url.path(), extra = params.len(), "POST");

        let response = self.http.post(url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, text));
        }

        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|source| SabnzbdError::Decode {
                mode: mode.to_string(),
                source,
            })?;

        if let Some(message) = reported_error(&value) {
            tracing::debug!(mode, "server error: {message}");
            if message.to_ascii_lowercase().contains("api key") {
                return Err(SabnzbdError::Authentication { message });
            }
            return Err(SabnzbdError::Server { message });
        }

        Ok(value)
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// [`call`](Self::call) and decode into the response shape for `mode`.
    async fn request<T: DeserializeOwned>(&self, mode: &str, params: QueryParams) -> Result<T> {
        let value = self.call(mode, &params).await?;
        serde_json::from_value(value).map_err(|source| SabnzbdError::Decode {
            mode: mode.to_string(),
            source,
        })
    }
}

/// Map a non-success response to a typed error.
fn status_error(status: StatusCode, text: String) -> SabnzbdError {
    let status_code = status.as_u16();
    let body: Option<serde_json::Value> = serde_json::from_str(&text).ok();
    let message = body
        .as_ref()
        .and_then(|b| b.get("error"))
        .and_then(|e| e.as_str())
        .unwrap_or(text.trim())
        .to_string();

    match status_code {
        401 | 403 => SabnzbdError::Authentication { message },
        _ => SabnzbdError::Api {
            status_code,
            message,
            body,
        },
    }
}

/// `Some(message)` for a `{"status": false, "error": "..."}` body.
fn reported_error(value: &serde_json::Value) -> Option<String> {
    if value.get("status").and_then(|s| s.as_bool()) != Some(false) {
        return None;
    }
    let message = value
        .get("error")
        .and_then(|e| e.as_str())
        .unwrap_or("request rejected");
    Some(message.to_string())
}
