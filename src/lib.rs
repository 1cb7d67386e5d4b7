//! # Mail.tm Client
//! Asynchronous wrapper around the Mail.tm disposable email HTTP API: create a throwaway
//! mailbox, then wait for incoming messages with [`Client::listen_messages`], handing each
//! new [`Message`] to your own handler until it reports a result.
//!
//! ## Audience and uses
//! For Rust developers who need a real inbox in integration tests, sign-up flows, or
//! automation scripts: configure with [`ClientBuilder`], create an [`Account`], then listen
//! for the verification mail you are waiting for.
//!
//! ## Runtime requirements
//! Async-only; run inside a Tokio (v1) runtime. HTTP calls use `reqwest`.
//!
//! ## Rate limiting
//! Every request is preceded by a short pause (250 ms by default). When the service answers
//! `429 Too Many Requests`, the client waits `n * 15 s` (for the n-th consecutive hit) and
//! retries without limit, so callers never see rate-limit errors.
//!
//! ## Diagnostics
//! With [`ClientBuilder::verbose`] enabled, warnings about unexpected statuses, malformed
//! bodies, and API errors are emitted through `tracing` under the `mailtm_client` target.
//! Install any `tracing` subscriber to see them.
//!
//! ## Errors
//! Transport failures surface as [`Error::Request`]. Responses that are empty, not JSON,
//! an API error payload, or shaped unexpectedly map to [`Error::EmptyBody`],
//! [`Error::InvalidJson`], [`Error::Api`] and [`Error::UnexpectedShape`]. The crate-wide
//! [`Result`] alias wraps these errors.
//!
//! ## Example
//! ```no_run
//! use mailtm_client::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mailtm_client::Error> {
//!     let mut client = Client::new()?;
//!     let account = client.create_account(None, None).await?;
//!     println!("Created: {}", account.address);
//!
//!     let subject = client
//!         .listen_messages(|message| {
//!             println!("From: {}, Subject: {}", message.from.address, message.subject);
//!             message.subject.contains("Verify").then_some(message.subject)
//!         })
//!         .await?;
//!
//!     println!("Matched: {subject:?}");
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod login;
mod models;

pub use client::{
    Client, ClientBuilder, DEFAULT_LISTEN_TIMEOUT, DEFAULT_MAJOR_DELAY, DEFAULT_MINOR_DELAY,
    DEFAULT_POLL_INTERVAL, backoff_delay,
};
pub use error::Error;
pub use login::{LoginGenerator, PASSWORD_LENGTH, WordlistLogin, generate_password};
pub use models::{Account, JsonObject, Message, Subject};

/// Result type alias for Mail.tm operations.
///
/// This is equivalent to `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
