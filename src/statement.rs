// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! KSQL statement text generation.
//!
//! The statement endpoint accepts SQL text only, so every operation
//! ultimately renders to a single semicolon-terminated statement. The
//! `WITH` clause properties are emitted in a fixed order so that a given
//! configuration always renders to byte-identical text.

use crate::stream::StreamConfig;

/// The leading keywords of a `CREATE STREAM` statement.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum CreateMode {
    /// `CREATE SOURCE STREAM`, for read-only source streams.
    Source,
    /// `CREATE OR REPLACE STREAM`, for both initial creation and updates.
    OrReplace,
}

/// Renders the `CREATE STREAM` statement for `config`.
///
/// Unset optional properties are omitted from the `WITH` clause. Integer
/// values are quoted like string values; the engine accepts both spellings
/// and quoting keeps the statement uniform.
pub(crate) fn create_stream(config: &StreamConfig, mode: CreateMode) -> String {
    let mut sql = String::from("CREATE");
    match mode {
        CreateMode::Source => sql.push_str(" SOURCE"),
        CreateMode::OrReplace => sql.push_str(" OR REPLACE"),
    }
    sql.push_str(" STREAM ");
    sql.push_str(&config.name);
    sql.push_str(" WITH (");

    let mut props: Vec<String> = Vec::new();
    if let Some(topic) = &config.kafka_topic {
        props.push(format!("KAFKA_TOPIC = '{}'", topic));
    }
    if let Some(partitions) = config.partitions {
        props.push(format!("PARTITIONS = '{}'", partitions));
    }
    if let Some(replicas) = config.replicas {
        props.push(format!("REPLICAS = '{}'", replicas));
    }
    if let Some(retention_ms) = config.retention_ms {
        props.push(format!("RETENTION_MS = '{}'", retention_ms));
    }
    if let Some(timestamp) = &config.timestamp {
        props.push(format!("TIMESTAMP = '{}'", timestamp));
    }
    if let Some(timestamp_format) = &config.timestamp_format {
        props.push(format!("TIMESTAMP_FORMAT = '{}'", timestamp_format));
    }
    if let Some(key_format) = config.key_format {
        props.push(format!("KEY_FORMAT = '{}'", key_format));
    }
    if let Some(value_format) = config.value_format {
        props.push(format!("VALUE_FORMAT = '{}'", value_format));
    }
    if let Some(key_schema_id) = config.key_schema_id {
        props.push(format!("KEY_SCHEMA_ID = '{}'", key_schema_id));
    }
    if let Some(value_schema_id) = config.value_schema_id {
        props.push(format!("VALUE_SCHEMA_ID = '{}'", value_schema_id));
    }
    sql.push_str(&props.join(", "));
    sql.push(')');

    if let Some(query) = &config.query {
        sql.push_str(" AS ");
        sql.push_str(query);
    }
    sql.push(';');
    sql
}

/// Renders a `DESCRIBE` statement for the named stream.
pub(crate) fn describe(name: &str) -> String {
    format!("DESCRIBE {};", name)
}

/// Renders a `DROP STREAM` statement for the named stream.
pub(crate) fn drop_stream(name: &str) -> String {
    format!("DROP STREAM {};", name)
}
