// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Error types for ksqlDB API operations.

use std::fmt;

use thiserror::Error;

/// An error reported by the ksqlDB server.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// The engine's numeric error code.
    pub code: i64,
    /// A detailed message about the error condition.
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (error code {})", self.message, self.code)
    }
}

impl std::error::Error for ApiError {}

/// Errors that can occur while operating on ksqlDB streams.
#[derive(Error, Debug)]
pub enum Error {
    /// A network-level failure while talking to the server.
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server reported an error for the submitted statement.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The response body was not well-formed JSON.
    #[error("unable to decode ksql response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The response body was a JSON value of the wrong shape.
    #[error("response must be object or list")]
    UnexpectedResponse,
    /// The stream configuration violates a constraint the engine imposes.
    #[error("invalid stream configuration: {0}")]
    InvalidConfig(String),
    /// A stream with the requested name already exists.
    #[error("there is already a stream or a table named {0}")]
    AlreadyExists(String),
    /// No stream with the requested name exists.
    #[error("there is no stream or table named {0}")]
    NoSuchStream(String),
    /// The server could not find the requested stream.
    #[error("stream or table {name} not found: {message}")]
    NotFound {
        /// The name of the stream.
        name: String,
        /// The engine's own message text.
        message: String,
    },
    /// A schema ID in an echoed statement did not fit in an `i64`.
    #[error("schema id in statement {statement:?} is out of range")]
    InvalidSchemaId {
        /// The statement the ID was extracted from.
        statement: String,
    },
    /// The engine reported a timestamp column that does not occur in the
    /// statement that created the stream.
    #[error("timestamp column {column:?} does not occur in statement {statement:?}")]
    TimestampNotInStatement {
        /// The reported timestamp column.
        column: String,
        /// The echoed statement.
        statement: String,
    },
    /// A stream was created, but the follow-up describe failed. The stream
    /// exists on the server; retrying the create would fail with "already
    /// exists".
    #[error("stream {name} was created but reading it back failed")]
    Readback {
        /// The name of the stream.
        name: String,
        /// The error from the follow-up describe.
        #[source]
        source: Box<Error>,
    },
}
