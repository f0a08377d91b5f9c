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

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::{
    subscriber::Subscriber,
    transport::{client::HttpClient, Credentials, Endpoint, Form, Region, Transport},
};

/// Mailgun message builder.
///
/// Accumulates the fields of a single outbound message and submits them with
/// [`MessageBuilder::send`]. The same instance can subscribe addresses to a
/// mailing list with [`MessageBuilder::subscribe`]. Failures are reported as
/// `false` and the reason is kept until the next failing call, see
/// [`MessageBuilder::error`].
#[derive(Debug, Clone)]
pub struct MessageBuilder<T = HttpClient> {
    transport: T,
    endpoint: Endpoint,
    credentials: Credentials,
    domain: String,
    from: String,
    reply_to: String,
    schedule: Option<i64>,
    recipients: Vec<String>,
    subject: String,
    text: String,
    html: String,
    error: String,
}

impl MessageBuilder<HttpClient> {
    /// Create a new message for the specified API key and sending domain.
    pub fn new(api_key: impl Into<String>, domain: impl Into<String>) -> Self {
        MessageBuilder::with_transport(api_key, domain, HttpClient::new())
    }
}

impl<T> MessageBuilder<T> {
    /// Create a new message submitted through a custom transport.
    pub fn with_transport(
        api_key: impl Into<String>,
        domain: impl Into<String>,
        transport: T,
    ) -> Self {
        MessageBuilder {
            transport,
            endpoint: Endpoint::default(),
            credentials: Credentials::api_key(api_key),
            domain: domain.into(),
            from: String::new(),
            reply_to: String::new(),
            schedule: None,
            recipients: Vec::new(),
            subject: String::new(),
            text: String::new(),
            html: String::new(),
            error: String::new(),
        }
    }

    /// Use the API host of a Mailgun region.
    pub fn region(mut self, region: Region) -> Self {
        self.endpoint = region.into();
        self
    }

    /// Override the API base URL, for example `http://localhost:8080/v3`.
    pub fn base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.endpoint = Endpoint::new(base_url);
        self
    }

    /// Set the sender of the message.
    pub fn from(mut self, email: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        self.from = format!("{} <{}>", name.as_ref(), email.as_ref());
        self
    }

    /// Set the address replies should be sent to.
    pub fn reply_to(mut self, email: impl Into<String>) -> Self {
        self.reply_to = email.into();
        self
    }

    /// Defer delivery until the given Unix timestamp.
    pub fn schedule(mut self, unix_time: i64) -> Self {
        self.schedule = Some(unix_time);
        self
    }

    /// Add a message recipient. An empty name defaults to the e-mail address.
    pub fn add_recipient(mut self, email: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        let email = email.as_ref();
        let name = name.as_ref();
        self.recipients.push(format!(
            "{} <{}>",
            if !name.is_empty() { name } else { email },
            email
        ));
        self
    }

    /// Set the message subject.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the plain text body.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the HTML body.
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn from_address(&self) -> &str {
        &self.from
    }

    pub fn reply_to_address(&self) -> &str {
        &self.reply_to
    }

    pub fn scheduled_at(&self) -> Option<i64> {
        self.schedule
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Last recorded error, or an empty string if no call has failed yet.
    ///
    /// A successful call does not reset it.
    pub fn error(&self) -> &str {
        &self.error
    }

    pub(crate) fn form(&self) -> crate::Result<Form<'_>> {
        let mut form = vec![
            ("from", Cow::Borrowed(self.from.as_str())),
            ("to", Cow::Owned(self.recipients.join(","))),
            ("subject", Cow::Borrowed(self.subject.as_str())),
            ("text", Cow::Borrowed(self.text.as_str())),
            ("html", Cow::Borrowed(self.html.as_str())),
        ];
        if !self.reply_to.is_empty() {
            form.push(("h:Reply-To", Cow::Borrowed(self.reply_to.as_str())));
        }
        if let Some(schedule) = self.schedule {
            form.push(("o:deliverytime", Cow::Owned(rfc2822(schedule)?)));
        }
        Ok(form)
    }

    fn record(&mut self, result: crate::Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                self.error = err.to_string();
                false
            }
        }
    }
}

impl<T: Transport> MessageBuilder<T> {
    /// Sends the message, returning the failure reason on error.
    pub async fn try_send(&self) -> crate::Result<()> {
        let form = self.form()?;
        self.post(&self.endpoint.messages(&self.domain), &form).await
    }

    /// Sends the message.
    /// Returns `true` if the API accepted it, otherwise the reason is available from [`MessageBuilder::error`].
    pub async fn send(&mut self) -> bool {
        let result = self.try_send().await;
        self.record(result)
    }

    /// Subscribes an address to a mailing list, returning the failure reason on error.
    pub async fn try_subscribe<'y>(
        &self,
        list: &str,
        subscriber: impl Into<Subscriber<'y>>,
    ) -> crate::Result<()> {
        let subscriber = subscriber.into();
        let form = subscriber.form()?;
        self.post(&self.endpoint.list_members(list), &form).await
    }

    /// Subscribes an address to a mailing list.
    pub async fn subscribe<'y>(
        &mut self,
        list: &str,
        subscriber: impl Into<Subscriber<'y>>,
    ) -> bool {
        let result = self.try_subscribe(list, subscriber).await;
        self.record(result)
    }

    async fn post(&self, url: &str, form: &[(&'static str, Cow<'_, str>)]) -> crate::Result<()> {
        debug!(
            "POST {} as {:?} with fields {:?}",
            url,
            self.credentials.username(),
            form.iter().map(|(key, _)| *key).collect::<Vec<_>>()
        );

        let result = match self.transport.post_form(url, &self.credentials, form).await {
            Ok(response) if response.status == 200 => Ok(()),
            Ok(response) => Err(crate::Error::UnexpectedStatus {
                code: response.status,
                body: response.body,
            }),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            warn!("POST {} failed: {}", url, err);
        }
        result
    }
}

/// Formats a Unix timestamp as an RFC 2822 date in UTC, day zero-padded.
fn rfc2822(timestamp: i64) -> crate::Result<String> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|date| date.format("%a, %d %b %Y %H:%M:%S %z").to_string())
        .ok_or(crate::Error::InvalidSchedule(timestamp))
}

#[cfg(test)]
mod test {
    use std::{borrow::Cow, future::Future, sync::Mutex};

    use serde_json::json;

    use crate::{
        transport::{Credentials, Response, Transport},
        Error, Region, Subscriber,
    };

    use super::{rfc2822, MessageBuilder};

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Request {
        url: String,
        authorization: String,
        form: Vec<(String, String)>,
    }

    #[derive(Debug)]
    enum Outcome {
        Status(u16, &'static str),
        Fail(&'static str),
    }

    #[derive(Debug)]
    struct MockTransport {
        outcomes: Mutex<Vec<Outcome>>,
        requests: Mutex<Vec<Request>>,
    }

    impl MockTransport {
        fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
            let mut outcomes = outcomes.into_iter().collect::<Vec<_>>();
            outcomes.reverse();
            MockTransport {
                outcomes: Mutex::new(outcomes),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for MockTransport {
        fn post_form(
            &self,
            url: &str,
            credentials: &Credentials,
            form: &[(&'static str, Cow<'_, str>)],
        ) -> impl Future<Output = crate::Result<Response>> + Send {
            self.requests.lock().unwrap().push(Request {
                url: url.to_string(),
                authorization: credentials.authorization(),
                form: form
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
            });
            let result = match self.outcomes.lock().unwrap().pop() {
                Some(Outcome::Status(status, body)) => Ok(Response {
                    status,
                    body: body.to_string(),
                }),
                Some(Outcome::Fail(reason)) => Err(Error::Transport(reason.to_string())),
                None => panic!("Unexpected request to {}", url),
            };
            async move { result }
        }
    }

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn recipient_names() {
        let message = MessageBuilder::with_transport("key", "example.com", ())
            .add_recipient("b@x.com", "")
            .add_recipient("c@x.com", "Charlie")
            .add_recipient("not an address", "");
        assert_eq!(
            message.recipients(),
            [
                "b@x.com <b@x.com>",
                "Charlie <c@x.com>",
                "not an address <not an address>"
            ]
        );

        // No defaulting for the sender
        assert_eq!(message.domain(), "example.com");
        assert_eq!(message.reply_to_address(), "");
        assert_eq!(message.scheduled_at(), None);

        let message = message.reply_to("help@x.com").schedule(0);
        assert_eq!(message.reply_to_address(), "help@x.com");
        assert_eq!(message.scheduled_at(), Some(0));

        let message = message.from("a@x.com", "");
        assert_eq!(message.from_address(), " <a@x.com>");
        assert_eq!(message.from("a@x.com", "A").from_address(), "A <a@x.com>");
    }

    #[test]
    fn message_form() {
        let message = MessageBuilder::with_transport("key", "example.com", ())
            .from("a@x.com", "A")
            .add_recipient("b@x.com", "B")
            .add_recipient("c@x.com", "")
            .subject("first")
            .subject("Hi")
            .text("Hello")
            .html("<p>Hello</p>");

        {
            let form = message.form().unwrap();
            assert_eq!(
                form.iter().map(|(key, _)| *key).collect::<Vec<_>>(),
                ["from", "to", "subject", "text", "html"]
            );
            assert_eq!(form[1].1, "B <b@x.com>,c@x.com <c@x.com>");
            assert_eq!(form[2].1, "Hi");
        }

        let message = message.reply_to("Support <help@x.com>").schedule(1136214245);
        let form = message.form().unwrap();
        assert_eq!(form[5], ("h:Reply-To", Cow::Borrowed("Support <help@x.com>")));
        assert_eq!(
            form[6],
            (
                "o:deliverytime",
                Cow::Borrowed("Mon, 02 Jan 2006 15:04:05 +0000")
            )
        );
    }

    #[test]
    fn schedule_format() {
        assert_eq!(rfc2822(0).unwrap(), "Thu, 01 Jan 1970 00:00:00 +0000");
        assert_eq!(
            rfc2822(1700000000).unwrap(),
            "Tue, 14 Nov 2023 22:13:20 +0000"
        );
        assert!(matches!(
            rfc2822(i64::MAX),
            Err(Error::InvalidSchedule(i64::MAX))
        ));
        assert_eq!(
            rfc2822(1136239445).unwrap(),
            "Mon, 02 Jan 2006 22:04:05 +0000"
        );
        assert_eq!(
            chrono::DateTime::parse_from_rfc2822(&rfc2822(1136239445).unwrap())
                .unwrap()
                .timestamp(),
            1136239445
        );
    }

    #[tokio::test]
    async fn send_message() {
        init_logger();

        let mut message = MessageBuilder::with_transport(
            "key-abc",
            "example.com",
            MockTransport::new([Outcome::Status(200, "{\"message\":\"Queued. Thank you.\"}")]),
        )
        .from("a@x.com", "A")
        .add_recipient("b@x.com", "")
        .subject("Hi")
        .text("Hello");

        assert!(message.send().await);
        assert_eq!(message.error(), "");
        assert_eq!(
            message.transport.requests(),
            [Request {
                url: "https://api.mailgun.net/v3/example.com/messages".to_string(),
                authorization: Credentials::new("api", "key-abc").authorization(),
                form: fields(&[
                    ("from", "A <a@x.com>"),
                    ("to", "b@x.com <b@x.com>"),
                    ("subject", "Hi"),
                    ("text", "Hello"),
                    ("html", ""),
                ]),
            }]
        );
    }

    #[tokio::test]
    async fn send_failures() {
        init_logger();

        let mut message = MessageBuilder::with_transport(
            "key-abc",
            "example.com",
            MockTransport::new([
                Outcome::Status(500, "server error"),
                Outcome::Fail("connection refused"),
                Outcome::Status(200, ""),
                Outcome::Status(401, "Forbidden"),
            ]),
        )
        .region(Region::Eu)
        .from("a@x.com", "A")
        .add_recipient("b@x.com", "B");

        assert!(!message.send().await);
        assert_eq!(message.error(), "Unexpected HTTP code: 500(server error)");

        assert!(!message.send().await);
        assert_eq!(message.error(), "connection refused");

        // Success leaves the previous error in place
        assert!(message.send().await);
        assert_eq!(message.error(), "connection refused");

        assert!(matches!(
            message.try_send().await,
            Err(Error::UnexpectedStatus { code: 401, body }) if body == "Forbidden"
        ));
        assert_eq!(message.error(), "connection refused");

        let requests = message.transport.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests
            .iter()
            .all(|request| request.url == "https://api.eu.mailgun.net/v3/example.com/messages"));
    }

    #[tokio::test]
    async fn invalid_schedule_is_not_sent() {
        let mut message =
            MessageBuilder::with_transport("key-abc", "example.com", MockTransport::new([]))
                .schedule(i64::MIN);

        assert!(!message.send().await);
        assert_eq!(message.error(), Error::InvalidSchedule(i64::MIN).to_string());
        assert!(message.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn subscribe_member() {
        init_logger();

        let mut client = MessageBuilder::with_transport(
            "key-abc",
            "example.com",
            MockTransport::new([
                Outcome::Status(200, "{}"),
                Outcome::Status(400, "Address already exists"),
                Outcome::Fail("dns error"),
                Outcome::Status(200, "{}"),
            ]),
        )
        .base_url("http://localhost:9000/v3/");

        assert!(
            client
                .subscribe(
                    "list1",
                    Subscriber::new("c@x.com").name("C").var("k", "v").unwrap()
                )
                .await
        );
        assert!(!client.subscribe("list1", "c@x.com").await);
        assert_eq!(
            client.error(),
            "Unexpected HTTP code: 400(Address already exists)"
        );
        assert!(!client.subscribe("list1", ("d@x.com", "D")).await);
        assert_eq!(client.error(), "dns error");
        assert!(client
            .try_subscribe(
                "list2",
                Subscriber::new("e@x.com").var("n", json!([1, 2])).unwrap()
            )
            .await
            .is_ok());

        let requests = client.transport.requests();
        assert_eq!(
            requests[0],
            Request {
                url: "http://localhost:9000/v3/lists/list1/members".to_string(),
                authorization: Credentials::api_key("key-abc").authorization(),
                form: fields(&[
                    ("subscribed", "True"),
                    ("address", "c@x.com"),
                    ("name", "C"),
                    ("vars", "{\"k\":\"v\"}"),
                ]),
            }
        );
        assert_eq!(
            requests[1].form,
            fields(&[
                ("subscribed", "True"),
                ("address", "c@x.com"),
                ("name", ""),
                ("vars", "{}"),
            ])
        );
        assert_eq!(requests[2].form[2], ("name".to_string(), "D".to_string()));
        assert_eq!(requests[3].url, "http://localhost:9000/v3/lists/list2/members");
        assert_eq!(
            requests[3].form[3],
            ("vars".to_string(), "{\"n\":[1,2]}".to_string())
        );
    }
}
