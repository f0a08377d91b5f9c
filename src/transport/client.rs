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

use std::{borrow::Cow, future::Future, time::Duration};

use reqwest::header::AUTHORIZATION;

use super::{Credentials, Response, Transport};

/// Default HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct HttpClientBuilder {
    timeout: Option<Duration>,
    allow_invalid_certs: bool,
    user_agent: Option<String>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl From<reqwest::Client> for HttpClient {
    fn from(client: reqwest::Client) -> Self {
        HttpClient {
            client,
            timeout: None,
        }
    }
}

impl HttpClient {
    /// Creates a new client without a request timeout.
    pub fn new() -> Self {
        reqwest::Client::new().into()
    }

    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }
}

impl HttpClientBuilder {
    /// Sets the timeout for a whole request, including reading the response body.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Allow invalid TLS certificates
    pub fn allow_invalid_certs(mut self, allow_invalid_certs: bool) -> Self {
        self.allow_invalid_certs = allow_invalid_certs;
        self
    }

    /// Sets the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> crate::Result<HttpClient> {
        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(self.allow_invalid_certs);
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        Ok(HttpClient {
            client: builder.build()?,
            timeout: self.timeout,
        })
    }
}

impl Transport for HttpClient {
    fn post_form(
        &self,
        url: &str,
        credentials: &Credentials,
        form: &[(&'static str, Cow<'_, str>)],
    ) -> impl Future<Output = crate::Result<Response>> + Send {
        let request = self
            .client
            .post(url)
            .header(AUTHORIZATION, credentials.authorization())
            .form(form);
        let timeout = self.timeout;

        async move {
            let exchange = async {
                let response = request.send().await?;
                let status = response.status().as_u16();
                Ok::<_, crate::Error>(Response {
                    status,
                    body: response.text().await?,
                })
            };

            match timeout {
                Some(timeout) => tokio::time::timeout(timeout, exchange)
                    .await
                    .map_err(|_| crate::Error::Timeout)?,
                None => exchange.await,
            }
        }
    }
}
