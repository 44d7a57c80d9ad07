// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A client for the ksqlDB statement endpoint.

use std::collections::BTreeMap;

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, trace};
use url::Url;

use crate::config::Auth;
use crate::error::{ApiError, Error};
use crate::reconcile::{self, StreamState};
use crate::statement::{self, CreateMode};
use crate::stream::StreamConfig;

/// The content type of the ksqlDB statement endpoint.
const ACCEPT_KSQL_V1_JSON: &str = "application/vnd.ksql.v1+json";

/// An API client for a ksqlDB server.
///
/// Use a [`ClientConfig`](crate::ClientConfig) to build a client. All
/// operations submit a single statement to the server's `/ksql` endpoint
/// and are serialized: at most one request per client is in flight at a
/// time.
pub struct Client {
    inner: reqwest::Client,
    ksql_url: Url,
    auth: Auth,
    // ksqlDB can fail with a ProducerFencedException when two statements
    // against the same topic race, so requests are serialized regardless of
    // which stream they touch.
    lock: Mutex<()>,
}

#[derive(Serialize)]
struct Request<'a> {
    ksql: &'a str,
    #[serde(rename = "streamsProperties")]
    streams_properties: &'a BTreeMap<String, String>,
}

/// One entry of a statement endpoint response.
#[derive(Debug, Default, Deserialize)]
struct Response {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    message: String,
    #[serde(default, rename = "sourceDescription")]
    source_description: SourceDescription,
}

/// The engine's structured description of a stream, as returned for a
/// `DESCRIBE` statement.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct SourceDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "keyFormat")]
    pub key_format: String,
    #[serde(default, rename = "valueFormat")]
    pub value_format: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub partitions: i64,
    #[serde(default)]
    pub replication: i64,
    #[serde(default)]
    pub statement: String,
    #[serde(default)]
    pub timestamp: String,
}

impl Client {
    pub(crate) fn new(inner: reqwest::Client, url: Url, auth: Auth) -> Result<Client, Error> {
        if url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "cannot construct a ksql client with the cannot-be-a-base URL {}",
                url
            )));
        }
        let mut ksql_url = url;
        ksql_url
            .path_segments_mut()
            .expect("base URLs have path segments")
            .pop_if_empty()
            .push("ksql");
        Ok(Client {
            inner,
            ksql_url,
            auth,
            lock: Mutex::new(()),
        })
    }

    /// Creates a new stream from `config`.
    ///
    /// Fails with [`Error::AlreadyExists`] if a stream or table of the same
    /// name exists; no create statement is sent in that case. On success the
    /// stream is described again and the reconciled state returned, since
    /// the engine applies defaults the configuration leaves unset.
    pub async fn create_stream(&self, config: &StreamConfig) -> Result<StreamState, Error> {
        config.validate()?;
        if self.exists(&config.name).await? {
            return Err(Error::AlreadyExists(config.name.clone()));
        }
        let mode = if config.source {
            CreateMode::Source
        } else {
            CreateMode::OrReplace
        };
        let ksql = statement::create_stream(config, mode);
        self.execute(&ksql, &config.properties).await?;

        // The create went through, so a describe failure here leaves the
        // stream behind with no state to show for it. Retrying the create
        // would fail with "already exists", so surface the inconsistency.
        match self.describe(&config.name).await {
            Ok(state) => Ok(state),
            Err(err) => Err(Error::Readback {
                name: config.name.clone(),
                source: Box::new(err),
            }),
        }
    }

    /// Updates an existing stream to match `config`.
    ///
    /// Updating is creating with `CREATE OR REPLACE`, so the stream must
    /// already exist and must not be a source stream (those are read-only).
    pub async fn update_stream(&self, config: &StreamConfig) -> Result<StreamState, Error> {
        config.validate()?;
        if config.source {
            return Err(Error::InvalidConfig(
                "source streams are read-only and cannot be updated".into(),
            ));
        }
        if !self.exists(&config.name).await? {
            return Err(Error::NoSuchStream(config.name.clone()));
        }
        let ksql = statement::create_stream(config, CreateMode::OrReplace);
        self.execute(&ksql, &config.properties).await?;
        self.describe(&config.name).await
    }

    /// Fetches the state of the named stream.
    ///
    /// Fails with [`Error::NotFound`] if the engine reports no such source,
    /// carrying the engine's own message.
    pub async fn describe(&self, name: &str) -> Result<StreamState, Error> {
        let source = self.describe_source(name).await?;
        reconcile::reconcile(&source)
    }

    /// Drops the named stream.
    ///
    /// Fails with [`Error::NoSuchStream`] if the stream does not exist.
    pub async fn drop_stream(&self, name: &str) -> Result<(), Error> {
        if !self.exists(name).await? {
            return Err(Error::NoSuchStream(name.to_owned()));
        }
        let res = self
            .execute(&statement::drop_stream(name), &BTreeMap::new())
            .await?;
        // the engine reports some drop failures with a 200 status
        if res.error_code != 0 {
            return Err(ApiError {
                code: res.error_code,
                message: res.message,
            }
            .into());
        }
        Ok(())
    }

    async fn describe_source(&self, name: &str) -> Result<SourceDescription, Error> {
        match self.execute(&statement::describe(name), &BTreeMap::new()).await {
            Ok(res) => Ok(res.source_description),
            Err(Error::Api(err)) => Err(Error::NotFound {
                name: name.to_owned(),
                message: err.message,
            }),
            Err(err) => Err(err),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool, Error> {
        match self.describe_source(name).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Submits a single KSQL statement to the server.
    async fn execute(
        &self,
        ksql: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<Response, Error> {
        let req = Request {
            ksql,
            streams_properties: properties,
        };
        debug!(%ksql, "executing ksql statement");

        let res = {
            let _guard = self.lock.lock().await;
            self.inner
                .post(self.ksql_url.clone())
                .basic_auth(&self.auth.username, Some(&self.auth.password))
                .header(ACCEPT, ACCEPT_KSQL_V1_JSON)
                .json(&req)
                .send()
                .await?
            // lock released here: decoding the body does not touch the server
        };

        let status = res.status();
        let body = res.bytes().await?;
        trace!(%status, bytes = body.len(), "received ksql response");

        if status != StatusCode::OK {
            let res: Response = serde_json::from_slice(&body)?;
            return Err(ApiError {
                code: res.error_code,
                message: res.message,
            }
            .into());
        }

        decode_response(&body)
    }
}

/// Decodes a statement endpoint response body.
///
/// The endpoint returns a bare object for some statement kinds and a
/// singleton array for others, so both shapes are accepted and normalized
/// to the first entry. Any other top-level JSON value is rejected.
fn decode_response(body: &[u8]) -> Result<Response, Error> {
    for b in body {
        match b {
            // the only legal whitespace in a JSON document
            b' ' | b'\n' | b'\r' | b'\t' => continue,
            b'{' => return Ok(serde_json::from_slice(body)?),
            b'[' => {
                let responses: Vec<Response> = serde_json::from_slice(body)?;
                return responses.into_iter().next().ok_or(Error::UnexpectedResponse);
            }
            _ => return Err(Error::UnexpectedResponse),
        }
    }
    Err(Error::UnexpectedResponse)
}
