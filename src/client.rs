//! Mail.tm async client implementation.
//!
//! This module provides an async [`Client`] and [`ClientBuilder`] for interacting with
//! the Mail.tm temporary email service.
//!
//! Typical flow:
//! 1) Build a client (`Client::new` or `Client::builder().build()`)
//! 2) Create a mailbox via [`Client::create_account`]
//! 3) Wait for mail with [`Client::listen_messages`], or poll by hand with
//!    [`Client::list_messages`] and [`Client::fetch_message`]
//!
//! Every request is paced by a short fixed delay, and HTTP 429 responses are retried
//! after a backoff that grows linearly with the number of consecutive rate-limit hits.

use crate::login::{LoginGenerator, WordlistLogin, generate_password};
use crate::models::{Account, JsonObject, Message, id_field};
use crate::{Error, Result};
use rand::seq::IndexedRandom;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::Level;

const API_ENDPOINT: &str = "https://api.mail.tm";
const USER_AGENT_VALUE: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Pause before every request.
pub const DEFAULT_MINOR_DELAY: Duration = Duration::from_millis(250);
/// Base unit of the rate-limit backoff.
pub const DEFAULT_MAJOR_DELAY: Duration = Duration::from_secs(15);
/// How long [`Client::listen_messages`] waits for a matching message.
pub const DEFAULT_LISTEN_TIMEOUT: Duration = Duration::from_secs(60);
/// Pause between two inbox listings in [`Client::listen_messages`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Backoff applied after the `retry`-th consecutive rate-limited response.
pub fn backoff_delay(major_delay: Duration, retry: u32) -> Duration {
    major_delay.saturating_mul(retry)
}

/// Identity of the mailbox this client acts for.
#[derive(Default)]
struct Session {
    address: Option<String>,
    password: Option<String>,
    token: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    address: &'a str,
    password: &'a str,
}

/// A raw response that made it through the transport layer.
///
/// Non-2xx statuses are kept so callers can still inspect API error payloads.
#[derive(Debug)]
struct ApiResponse {
    status: StatusCode,
    body: Vec<u8>,
}

/// Async client for the Mail.tm temporary email service.
///
/// A client owns one mailbox session: the address and password of the account it
/// created (or was given) and the bearer token exchanged for them. Stateful calls take
/// `&mut self`, so a client is driven by a single task at a time. Dropping the client
/// releases its connection pool; no runtime is needed for that.
pub struct Client {
    http: reqwest::Client,
    api_endpoint: String,
    minor_delay: Duration,
    major_delay: Duration,
    verbose: bool,
    proxy: Option<String>,
    login_generator: Arc<dyn LoginGenerator>,
    session: Session,
    retry: u32,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("http", &"<reqwest::Client>")
            .field("api_endpoint", &self.api_endpoint)
            .field("minor_delay", &self.minor_delay)
            .field("major_delay", &self.major_delay)
            .field("verbose", &self.verbose)
            .field("proxy", &self.proxy)
            .field("session", &self.session)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Client {
    /// Create a [`ClientBuilder`] for configuring a new client.
    ///
    /// # Examples
    /// ```no_run
    /// # use mailtm_client::Client;
    /// # use std::time::Duration;
    /// # fn main() -> Result<(), mailtm_client::Error> {
    /// let client = Client::builder()
    ///     .minor_delay(Duration::from_millis(500))
    ///     .verbose(true)
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a new Mail.tm client using default settings.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build()
    }

    /// Get the proxy URL configured for this client (if any).
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// The mailbox address this client acts for, once known.
    pub fn address(&self) -> Option<&str> {
        self.session.address.as_deref()
    }

    /// The bearer token, once it has been retrieved.
    pub fn token(&self) -> Option<&str> {
        self.session.token.as_deref()
    }

    /// The account this client acts for, if both address and password are known.
    pub fn account(&self) -> Option<Account> {
        match (&self.session.address, &self.session.password) {
            (Some(address), Some(password)) => Some(Account {
                address: address.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    /// Report a diagnostic through `tracing` when the client is verbose.
    pub fn notify(&self, level: Level, message: impl fmt::Display) {
        if !self.verbose {
            return;
        }
        if level == Level::ERROR {
            tracing::error!(target: "mailtm_client", "{message}");
        } else if level == Level::WARN {
            tracing::warn!(target: "mailtm_client", "{message}");
        } else if level == Level::INFO {
            tracing::info!(target: "mailtm_client", "{message}");
        } else {
            tracing::debug!(target: "mailtm_client", "{message}");
        }
    }

    /// Create a new mailbox on a random active domain.
    ///
    /// When `login` is `None` (or empty), one is drawn from the configured
    /// [`LoginGenerator`]. When `password` is `None` (or empty), an 18 character
    /// alphanumeric password is generated. On success the account becomes the
    /// session of this client.
    ///
    /// # Errors
    /// Returns [`Error::NoActiveDomains`] if the service offers no active domain, and the
    /// usual response errors ([`Error::Api`], [`Error::InvalidJson`], ...) if either request
    /// is rejected.
    ///
    /// # Examples
    /// ```no_run
    /// # use mailtm_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), mailtm_client::Error> {
    /// let mut client = Client::new()?;
    /// let account = client.create_account(None, None).await?;
    /// println!("{account}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_account(
        &mut self,
        login: Option<&str>,
        password: Option<&str>,
    ) -> Result<Account> {
        let login = match login.filter(|l| !l.is_empty()) {
            Some(login) => login.to_string(),
            None => self.login_generator.generate_login(),
        };
        let password = match password.filter(|p| !p.is_empty()) {
            Some(password) => password.to_string(),
            None => generate_password(),
        };

        let domains = self.retrieve_domains().await?;
        let domain = domains
            .choose(&mut rand::rng())
            .ok_or(Error::NoActiveDomains)?;

        let address = format!("{login}@{domain}");
        let body = serde_json::to_value(Credentials {
            address: &address,
            password: &password,
        })?;

        let response = self.request(Method::POST, "/accounts", Some(&body), false).await?;
        let created = self.expect_object("/accounts", self.decode("/accounts", response)?)?;

        let address = created
            .get("address")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| self.shape_error("/accounts", "an object with a string `address`"))?;

        self.session.address = Some(address.clone());
        self.session.password = Some(password.clone());

        Ok(Account { address, password })
    }

    /// List the summaries currently in the inbox.
    ///
    /// A bearer token is retrieved first if the session has none yet.
    ///
    /// # Errors
    /// Returns [`Error::MissingCredentials`] if no account is known, or a response error if
    /// the listing is rejected or is not an array of objects.
    pub async fn list_messages(&mut self) -> Result<Vec<JsonObject>> {
        self.ensure_token().await?;

        let response = self.request(Method::GET, "/messages", None, true).await?;
        match self.decode("/messages", response)? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    _ => Err(self.shape_error("/messages", "an array of objects")),
                })
                .collect(),
            _ => Err(self.shape_error("/messages", "an array")),
        }
    }

    /// Fetch the full payload of one message.
    ///
    /// The result is the validated wire object; decode it with [`Message::from_json`], or
    /// use [`Client::get_message`] to do both at once.
    pub async fn fetch_message(&mut self, id: &str) -> Result<JsonObject> {
        self.ensure_token().await?;

        let path = format!("/messages/{id}");
        let response = self.request(Method::GET, &path, None, true).await?;
        let value = self.decode(&path, response)?;
        self.expect_object(&path, value)
    }

    /// Fetch and decode one message.
    pub async fn get_message(&mut self, id: &str) -> Result<Message> {
        let payload = self.fetch_message(id).await?;
        Ok(Message::from_json(payload))
    }

    /// Wait for a message the handler accepts, using the default timeout and poll interval.
    ///
    /// See [`Client::listen_messages_for`].
    ///
    /// # Examples
    /// ```no_run
    /// # use mailtm_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), mailtm_client::Error> {
    /// let mut client = Client::new()?;
    /// client.create_account(None, None).await?;
    /// let subject = client
    ///     .listen_messages(|message| Some(message.subject))
    ///     .await?;
    /// println!("{subject:?}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn listen_messages<T, F>(&mut self, handler: F) -> Result<Option<T>>
    where
        F: FnMut(Message) -> Option<T>,
    {
        self.listen_messages_for(handler, DEFAULT_LISTEN_TIMEOUT, DEFAULT_POLL_INTERVAL)
            .await
    }

    /// Poll the inbox and hand each new message to `handler` until it returns `Some`.
    ///
    /// Each message id is fetched and handed over at most once per call, even when the
    /// handler declines it by returning `None`. A message that fails to fetch is skipped
    /// and tried again on the next poll.
    ///
    /// The deadline is only checked between polls, so the call can overrun `timeout` by
    /// up to one `poll_interval` plus the time spent on in-flight requests. A `timeout`
    /// such as `Duration::MAX` that lies beyond any representable instant means the
    /// session only ends when the handler accepts a message or listing fails.
    ///
    /// # Returns
    /// `Ok(Some(value))` with the first value produced by the handler, or `Ok(None)` when
    /// the deadline passes first.
    ///
    /// # Errors
    /// A failure to list the inbox ends the session and is returned as is.
    pub async fn listen_messages_for<T, F>(
        &mut self,
        mut handler: F,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Option<T>>
    where
        F: FnMut(Message) -> Option<T>,
    {
        // `None` when the timeout does not fit in an `Instant`: listen until accepted.
        let deadline = Instant::now().checked_add(timeout);
        let mut processed_ids: Vec<String> = Vec::new();

        while deadline.is_none_or(|deadline| Instant::now() <= deadline) {
            let summaries = self.list_messages().await?;

            for summary in summaries {
                let id = id_field(summary.get("id").unwrap_or(&Value::Null));
                if id.is_empty() {
                    self.notify(Level::WARN, "</messages> listed a message without an id");
                    continue;
                }
                if processed_ids.contains(&id) {
                    continue;
                }

                let payload = match self.fetch_message(&id).await {
                    Ok(payload) => payload,
                    Err(err) => {
                        self.notify(Level::WARN, format!("skipping message {id}: {err}"));
                        continue;
                    }
                };

                if let Some(result) = handler(Message::from_json(payload)) {
                    return Ok(Some(result));
                }

                processed_ids.push(id);
            }

            sleep(poll_interval).await;
        }

        Ok(None)
    }

    async fn retrieve_domains(&mut self) -> Result<Vec<String>> {
        let response = self.request(Method::GET, "/domains", None, false).await?;
        let domains = match self.decode("/domains", response)? {
            Value::Array(items) => items,
            _ => return Err(self.shape_error("/domains", "an array")),
        };

        let active: Vec<String> = domains
            .iter()
            .filter(|d| d.get("isActive").and_then(Value::as_bool).unwrap_or(false))
            .filter_map(|d| d.get("domain").and_then(Value::as_str).map(str::to_string))
            .collect();

        if active.is_empty() {
            self.notify(Level::WARN, "</domains> has no active domain");
            return Err(Error::NoActiveDomains);
        }

        Ok(active)
    }

    async fn ensure_token(&mut self) -> Result<()> {
        if self.session.token.is_none() {
            self.retrieve_token().await?;
        }
        Ok(())
    }

    async fn retrieve_token(&mut self) -> Result<()> {
        let (address, password) = match (&self.session.address, &self.session.password) {
            (Some(address), Some(password)) => (address.clone(), password.clone()),
            _ => {
                self.notify(Level::WARN, "</token> requested without account credentials");
                return Err(Error::MissingCredentials);
            }
        };

        let body = serde_json::to_value(Credentials {
            address: &address,
            password: &password,
        })?;

        let response = self.request(Method::POST, "/token", Some(&body), false).await?;
        let payload = self.expect_object("/token", self.decode("/token", response)?)?;

        let token = payload
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| self.shape_error("/token", "an object with a string `token`"))?;

        if HeaderValue::from_str(&format!("Bearer {token}")).is_err() {
            return Err(self.shape_error("/token", "a token usable in an HTTP header"));
        }

        self.session.token = Some(token.to_string());
        Ok(())
    }

    /// Perform a request with pacing and rate-limit retries.
    ///
    /// Only transport failures are errors; any HTTP status other than 429 is handed back.
    async fn request(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        authorized: bool,
    ) -> Result<ApiResponse> {
        let url = format!("{}{}", self.api_endpoint.trim_end_matches('/'), path);

        loop {
            sleep(self.minor_delay).await;

            let mut headers = HeaderMap::new();
            if authorized {
                headers.insert(AUTHORIZATION, self.bearer_header()?);
            }

            tracing::debug!(%method, path, "mail.tm request");

            let mut builder = self.http.request(method.clone(), &url).headers(headers);
            if let Some(body) = body {
                builder = builder.json(body);
            }
            let response = builder.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                self.retry += 1;
                let delay = backoff_delay(self.major_delay, self.retry);
                self.notify(
                    Level::INFO,
                    format!(
                        "too many requests · #{} for {:.1}s",
                        self.retry,
                        delay.as_secs_f64()
                    ),
                );
                sleep(delay).await;
                continue;
            }

            if !(200..=204).contains(&status.as_u16()) {
                self.notify(
                    Level::WARN,
                    format!(
                        "<{}> returned unexpected response {}",
                        response.url().path(),
                        status.as_u16()
                    ),
                );
            }

            self.retry = 1;
            let body = response.bytes().await?;
            return Ok(ApiResponse {
                status,
                body: body.to_vec(),
            });
        }
    }

    /// Turn a response body into JSON, surfacing API error payloads.
    fn decode(&self, endpoint: &str, response: ApiResponse) -> Result<Value> {
        if response.body.is_empty() {
            self.notify(
                Level::WARN,
                format!("<{endpoint}> returned an empty body ({})", response.status),
            );
            return Err(Error::EmptyBody {
                endpoint: endpoint.to_string(),
            });
        }

        let value: Value = serde_json::from_slice(&response.body).map_err(|source| {
            self.notify(Level::WARN, format!("<{endpoint}> does not contain valid JSON"));
            Error::InvalidJson {
                endpoint: endpoint.to_string(),
                source,
            }
        })?;

        if let Some(detail) = api_error_detail(&value) {
            self.notify(Level::ERROR, format!("<api>: {detail}"));
            return Err(Error::Api {
                endpoint: endpoint.to_string(),
                detail,
            });
        }

        Ok(value)
    }

    fn expect_object(&self, endpoint: &str, value: Value) -> Result<JsonObject> {
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(self.shape_error(endpoint, "an object")),
        }
    }

    fn shape_error(&self, endpoint: &str, expected: &'static str) -> Error {
        self.notify(
            Level::WARN,
            format!("<{endpoint}> unexpected response, expected {expected}"),
        );
        Error::UnexpectedShape {
            endpoint: endpoint.to_string(),
            expected,
        }
    }

    fn bearer_header(&self) -> Result<HeaderValue> {
        let token = self.session.token.as_deref().ok_or(Error::MissingToken)?;
        HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| self.shape_error("/token", "a token usable in an HTTP header"))
    }
}

/// Extract the message of an API error payload (`detail` or `violations`).
fn api_error_detail(value: &Value) -> Option<String> {
    let map = value.as_object()?;

    if let Some(detail) = map.get("detail") {
        return Some(match detail {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
    }

    let violations = map.get("violations")?;
    let summary = violations
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|v| {
                    let field = v.get("propertyPath").and_then(Value::as_str).unwrap_or("");
                    let message = v.get("message").and_then(Value::as_str).unwrap_or("");
                    if field.is_empty() {
                        message.to_string()
                    } else {
                        format!("{field}: {message}")
                    }
                })
                .collect::<Vec<_>>()
                .join("; ")
        })
        .unwrap_or_else(|| violations.to_string());

    Some(summary)
}

/// Builder for configuring a Mail.tm [`Client`].
///
/// # Defaults
/// - API endpoint `https://api.mail.tm`
/// - 250 ms pause before each request, 15 s rate-limit backoff unit
/// - Diagnostics off (`verbose = false`)
/// - No proxy, no request timeout
/// - [`WordlistLogin`] for generated logins
#[derive(Clone)]
pub struct ClientBuilder {
    api_endpoint: String,
    minor_delay: Duration,
    major_delay: Duration,
    verbose: bool,
    user_agent: String,
    proxy: Option<String>,
    timeout: Option<Duration>,
    credentials: Option<(String, String)>,
    login_generator: Arc<dyn LoginGenerator>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("api_endpoint", &self.api_endpoint)
            .field("minor_delay", &self.minor_delay)
            .field("major_delay", &self.major_delay)
            .field("verbose", &self.verbose)
            .field("user_agent", &self.user_agent)
            .field("proxy", &self.proxy)
            .field("timeout", &self.timeout)
            .field(
                "credentials",
                &self.credentials.as_ref().map(|(address, _)| address),
            )
            .finish()
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    ///
    /// See [`ClientBuilder`] for the list of defaults.
    pub fn new() -> Self {
        Self {
            api_endpoint: API_ENDPOINT.to_string(),
            minor_delay: DEFAULT_MINOR_DELAY,
            major_delay: DEFAULT_MAJOR_DELAY,
            verbose: false,
            user_agent: USER_AGENT_VALUE.to_string(),
            proxy: None,
            timeout: None,
            credentials: None,
            login_generator: Arc::new(WordlistLogin),
        }
    }

    /// Override the API base URL.
    ///
    /// This is primarily useful for testing.
    pub fn api_endpoint(mut self, api_endpoint: impl Into<String>) -> Self {
        self.api_endpoint = api_endpoint.into();
        self
    }

    /// Set the pause taken before every request.
    pub fn minor_delay(mut self, delay: Duration) -> Self {
        self.minor_delay = delay;
        self
    }

    /// Set the backoff unit for rate-limited requests.
    ///
    /// The n-th consecutive 429 response waits `n * delay` before retrying.
    pub fn major_delay(mut self, delay: Duration) -> Self {
        self.major_delay = delay;
        self
    }

    /// Emit diagnostics through `tracing` (default: `false`).
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Override the default user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a proxy URL (e.g. `"socks5://127.0.0.1:9050"`).
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Set a per-request timeout.
    ///
    /// Unset by default: a slow request can then hold a listen session past its deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Act for an existing account instead of creating one.
    pub fn credentials(mut self, address: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((address.into(), password.into()));
        self
    }

    /// Replace the generator used when [`Client::create_account`] gets no login.
    pub fn login_generator(mut self, generator: impl LoginGenerator + 'static) -> Self {
        self.login_generator = Arc::new(generator);
        self
    }

    /// Build the [`Client`].
    ///
    /// No request is made; the first network traffic happens on the first API call.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed (e.g. an invalid proxy URL).
    pub fn build(self) -> Result<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, value);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);

        if let Some(proxy_url) = &self.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder.build()?;

        let session = match self.credentials {
            Some((address, password)) => Session {
                address: Some(address),
                password: Some(password),
                token: None,
            },
            None => Session::default(),
        };

        Ok(Client {
            http,
            api_endpoint: self.api_endpoint,
            minor_delay: self.minor_delay,
            major_delay: self.major_delay,
            verbose: self.verbose,
            proxy: self.proxy,
            login_generator: self.login_generator,
            session,
            retry: 0,
        })
    }
}
