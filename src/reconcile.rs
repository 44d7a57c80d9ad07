// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Recovery of stream state from describe responses.
//!
//! A `DESCRIBE` response reports most stream properties as structured JSON,
//! but not all of them. Schema IDs and the back-tick quoting of the
//! timestamp column survive only in the SQL text the engine echoes back in
//! the `statement` field, so they are recovered here with fixed text
//! patterns. This is narrowly-scoped text extraction, not SQL parsing: the
//! patterns match the two tokens the builder emits and nothing more.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::client::SourceDescription;
use crate::error::Error;

// Older engine releases echo schema IDs without the enclosing quotes, so
// the patterns accept both forms. Statements generated by this crate always
// quote them.
static KEY_SCHEMA_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)KEY_SCHEMA_ID\s*=\s*'?(\d+)'?").unwrap());
static VALUE_SCHEMA_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)VALUE_SCHEMA_ID\s*=\s*'?(\d+)'?").unwrap());

/// The observable state of a ksqlDB stream.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StreamState {
    /// The name of the stream.
    pub name: String,
    /// The Kafka topic that backs the stream.
    pub kafka_topic: String,
    /// The number of partitions in the backing topic.
    pub partitions: i64,
    /// The number of replicas in the backing topic.
    pub replicas: i64,
    /// The serialization format of the message key, as reported by the
    /// engine.
    pub key_format: String,
    /// The serialization format of the message value, as reported by the
    /// engine.
    pub value_format: String,
    /// The key schema ID, recovered from the creating statement. `None` if
    /// the statement does not set one.
    pub key_schema_id: Option<i64>,
    /// The value schema ID, recovered from the creating statement. `None`
    /// if the statement does not set one.
    pub value_schema_id: Option<i64>,
    /// The timestamp column, back-tick-quoted if the creating statement
    /// quoted it.
    pub timestamp: Option<String>,
}

/// Merges a describe response into the state of the stream it describes.
pub(crate) fn reconcile(source: &SourceDescription) -> Result<StreamState, Error> {
    Ok(StreamState {
        name: source.name.clone(),
        kafka_topic: source.topic.clone(),
        partitions: source.partitions,
        replicas: source.replication,
        key_format: source.key_format.clone(),
        value_format: source.value_format.clone(),
        key_schema_id: extract_schema_id(&source.statement, &KEY_SCHEMA_ID_PATTERN)?,
        value_schema_id: extract_schema_id(&source.statement, &VALUE_SCHEMA_ID_PATTERN)?,
        timestamp: timestamp_column(&source.statement, &source.timestamp)?,
    })
}

fn extract_schema_id(statement: &str, pattern: &Regex) -> Result<Option<i64>, Error> {
    match pattern.captures(statement) {
        None => Ok(None),
        Some(caps) => {
            let id = caps[1].parse().map_err(|_| Error::InvalidSchemaId {
                statement: statement.to_owned(),
            })?;
            Ok(Some(id))
        }
    }
}

/// Recovers the timestamp column from the creating statement, restoring the
/// back-ticks if the statement quoted it.
fn timestamp_column(statement: &str, timestamp: &str) -> Result<Option<String>, Error> {
    if timestamp.is_empty() {
        return Ok(None);
    }
    let index = statement
        .find(timestamp)
        .ok_or_else(|| Error::TimestampNotInStatement {
            column: timestamp.to_owned(),
            statement: statement.to_owned(),
        })?;
    let bytes = statement.as_bytes();
    let quoted = index > 0
        && bytes[index - 1] == b'`'
        && bytes.get(index + timestamp.len()) == Some(&b'`');
    if quoted {
        Ok(Some(format!("`{}`", timestamp)))
    } else {
        Ok(Some(timestamp.to_owned()))
    }
}
