// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Configuration for a ksqlDB [`Client`].

use std::time::Duration;

use url::Url;

use crate::client::Client;
use crate::error::Error;

/// HTTP basic authentication credentials.
///
/// ksqlDB expects the `Authorization` header on every request, so both
/// values are sent even when they are empty.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Auth {
    /// The username.
    pub username: String,
    /// The password.
    pub password: String,
}

/// Configuration for a [`Client`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    url: Url,
    auth: Auth,
    timeout: Duration,
}

impl ClientConfig {
    /// Constructs a new `ClientConfig` that will target the ksqlDB server
    /// at the specified URL.
    pub fn new(url: Url, auth: Auth) -> ClientConfig {
        ClientConfig {
            url,
            auth,
            timeout: Duration::from_secs(10),
        }
    }

    /// Overrides the default request timeout of 10 seconds.
    pub fn timeout(mut self, timeout: Duration) -> ClientConfig {
        self.timeout = timeout;
        self
    }

    /// Builds the [`Client`].
    pub fn build(self) -> Result<Client, Error> {
        let inner = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(self.timeout)
            .build()?;
        Client::new(inner, self.url, self.auth)
    }
}
