// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! An API client for the ksqlDB REST interface.
//!
//! The client speaks the statement endpoint of the [ksqlDB HTTP API]. It
//! renders `CREATE STREAM`, `DESCRIBE`, and `DROP STREAM` statements from a
//! structured [`StreamConfig`], submits them with HTTP basic authentication,
//! and maps the engine's responses back into a [`StreamState`].
//!
//! ksqlDB does not report every stream property in structured form. Schema
//! IDs and the back-tick quoting of the timestamp column survive only in the
//! SQL text the engine echoes back in its describe responses, so reading a
//! stream involves recovering those fields from the statement text with
//! fixed patterns.
//!
//! The client serializes requests: ksqlDB can fail with a
//! `ProducerFencedException` when two statements against the same topic
//! race, so at most one request per [`Client`] is in flight at a time.
//!
//! [ksqlDB HTTP API]: https://docs.ksqldb.io/en/latest/developer-guide/api/

mod client;
mod config;
mod error;
mod reconcile;
mod statement;
mod stream;

pub use client::Client;
pub use config::{Auth, ClientConfig};
pub use error::{ApiError, Error};
pub use reconcile::StreamState;
pub use stream::{Format, ParseFormatError, StreamConfig};
