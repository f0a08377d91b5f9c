/*
 * Copyright Stalwart Labs Ltd. See the COPYING
 * file at the top-level directory of this distribution.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

//! # mailgun-send
//!
//! _mailgun-send_ is a small Rust library to submit e-mail messages and mailing list
//! subscriptions through the Mailgun HTTP API. It includes the following features:
//!
//! - Fluent **message builder** (sender, recipients, subject, text and HTML bodies).
//! - Optional **Reply-To** header and **scheduled delivery** (_RFC 2822_ delivery time).
//! - **Mailing list** subscriptions with custom JSON variables.
//! - US and EU API regions, or any custom base URL.
//! - Pluggable HTTP transport; the default one is built on `reqwest` with `rustls`.
//! - Full async (requires Tokio).
//!
//! ## Usage Example
//!
//! Send a message and inspect the error on failure:
//!
//! ```rust
//!     let mut message = MessageBuilder::new("key-abc", "example.com")
//!         .from("john@example.com", "John Doe")
//!         .add_recipient("jane@example.com", "Jane Doe")
//!         .add_recipient("james@test.com", "")
//!         .reply_to("support@example.com")
//!         .subject("Hi!")
//!         .html("<h1>Hello, world!</h1>")
//!         .text("Hello world!");
//!
//!     if !message.send().await {
//!         eprintln!("Delivery failed: {}", message.error());
//!     }
//! ```
//!
//! Subscribe an address to a mailing list:
//!
//! ```rust
//!     let mut client = MessageBuilder::new("key-abc", "example.com").region(Region::Eu);
//!
//!     client
//!         .try_subscribe(
//!             "newsletter@example.com",
//!             Subscriber::new("jane@example.com")
//!                 .name("Jane Doe")
//!                 .var("plan", "premium")?,
//!         )
//!         .await?;
//! ```
//!
//! ## License
//!
//! Licensed under either of
//!
//!  * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//!  * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.
//!

pub mod message;
pub mod subscriber;
pub mod transport;

use std::fmt::Display;

pub use message::MessageBuilder;
pub use subscriber::Subscriber;
pub use transport::{client::HttpClient, Credentials, Endpoint, Region, Response, Transport};

#[derive(Debug)]
pub enum Error {
    /// The HTTP request could not be completed (DNS, connection, TLS, I/O).
    Transport(String),

    /// The API answered with a status other than 200.
    UnexpectedStatus { code: u16, body: String },

    /// Delivery time outside of the representable date range.
    InvalidSchedule(i64),

    /// Failure serializing list member variables.
    Json(serde_json::Error),

    /// Request timeout.
    Timeout,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Transport(e) => f.write_str(e),
            Error::UnexpectedStatus { code, body } => {
                write!(f, "Unexpected HTTP code: {}({})", code, body)
            }
            Error::InvalidSchedule(t) => write!(f, "Invalid delivery time: {}", t),
            Error::Json(e) => write!(f, "JSON encoding error: {}", e),
            Error::Timeout => write!(f, "Connection timeout"),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}
