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

use std::{borrow::Cow, future::Future};

use base64::{engine::general_purpose::STANDARD, Engine};

pub mod client;

/// URL-encoded form fields, in submission order.
pub type Form<'x> = Vec<(&'static str, Cow<'x, str>)>;

/// Completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

/// HTTP client capable of Basic-authenticated form POST requests.
///
/// Implementations return `Ok` whenever the server produced a response,
/// whatever its status code, and `Err` only when the round trip could not
/// be completed.
pub trait Transport {
    fn post_form(
        &self,
        url: &str,
        credentials: &Credentials,
        form: &[(&'static str, Cow<'_, str>)],
    ) -> impl Future<Output = crate::Result<Response>> + Send;
}

/// HTTP Basic credentials.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    secret: String,
}

impl Credentials {
    /// Creates a new `Credentials` instance.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Mailgun authenticates every API call as user `api`.
    pub fn api_key(api_key: impl Into<String>) -> Self {
        Credentials::new("api", api_key)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Value of the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", self.username, self.secret))
        )
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Mailgun API region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    Us,
    Eu,
}

impl Region {
    pub fn base_url(&self) -> &'static str {
        match self {
            Region::Us => "https://api.mailgun.net/v3",
            Region::Eu => "https://api.eu.mailgun.net/v3",
        }
    }
}

/// API endpoint URL templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Region::default().into()
    }
}

impl From<Region> for Endpoint {
    fn from(region: Region) -> Self {
        Endpoint::new(region.base_url())
    }
}

impl Endpoint {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Endpoint {
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Message submission URL for a sending domain.
    pub fn messages(&self, domain: &str) -> String {
        format!("{}/{}/messages", self.base_url, domain)
    }

    /// Member list URL for a mailing list address.
    pub fn list_members(&self, list: &str) -> String {
        format!("{}/lists/{}/members", self.base_url, list)
    }
}
