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

use serde::Serialize;
use serde_json::{Map, Value};

use crate::transport::Form;

/// Mailing list member to subscribe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subscriber<'x> {
    pub address: Cow<'x, str>,
    pub name: Cow<'x, str>,
    pub vars: Map<String, Value>,
}

impl<'x> Subscriber<'x> {
    /// Create a new subscriber with an empty name and no variables.
    pub fn new(address: impl Into<Cow<'x, str>>) -> Self {
        Subscriber {
            address: address.into(),
            name: Cow::Borrowed(""),
            vars: Map::new(),
        }
    }

    /// Set the member's display name.
    pub fn name(mut self, name: impl Into<Cow<'x, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a custom variable. Variables keep their insertion order.
    pub fn var(mut self, key: impl Into<String>, value: impl Serialize) -> crate::Result<Self> {
        self.vars.insert(key.into(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Replace all custom variables.
    pub fn vars(mut self, vars: Map<String, Value>) -> Self {
        self.vars = vars;
        self
    }

    pub(crate) fn form(&self) -> crate::Result<Form<'_>> {
        Ok(vec![
            ("subscribed", Cow::Borrowed("True")),
            ("address", Cow::Borrowed(self.address.as_ref())),
            ("name", Cow::Borrowed(self.name.as_ref())),
            ("vars", Cow::Owned(serde_json::to_string(&self.vars)?)),
        ])
    }
}

impl<'x> From<&'x str> for Subscriber<'x> {
    fn from(address: &'x str) -> Self {
        Subscriber::new(address)
    }
}

impl<'x> From<String> for Subscriber<'x> {
    fn from(address: String) -> Self {
        Subscriber::new(address)
    }
}

impl<'x> From<(&'x str, &'x str)> for Subscriber<'x> {
    fn from((address, name): (&'x str, &'x str)) -> Self {
        Subscriber::new(address).name(name)
    }
}
