// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The stream resource model.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::error::Error as ClientError;

/// A serialization format supported by ksqlDB.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    /// No serialization; the key or value is ignored.
    None,
    /// Delimited text.
    Delimited,
    /// Schemaless JSON.
    Json,
    /// JSON with a schema registered in Schema Registry.
    JsonSr,
    /// Avro with a schema registered in Schema Registry.
    Avro,
    /// The serialization used by Kafka itself for primitive types.
    Kafka,
    /// Protobuf with a schema registered in Schema Registry.
    Protobuf,
    /// Protobuf without Schema Registry integration.
    ProtobufNosr,
}

impl Format {
    /// Returns the engine's spelling of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::None => "NONE",
            Format::Delimited => "DELIMITED",
            Format::Json => "JSON",
            Format::JsonSr => "JSON_SR",
            Format::Avro => "AVRO",
            Format::Kafka => "KAFKA",
            Format::Protobuf => "PROTOBUF",
            Format::ProtobufNosr => "PROTOBUF_NOSR",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error while parsing a [`Format`].
#[derive(Clone, Debug, Error)]
#[error("unsupported format '{0}'")]
pub struct ParseFormatError(String);

impl FromStr for Format {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Format, ParseFormatError> {
        match s {
            "NONE" => Ok(Format::None),
            "DELIMITED" => Ok(Format::Delimited),
            "JSON" => Ok(Format::Json),
            "JSON_SR" => Ok(Format::JsonSr),
            "AVRO" => Ok(Format::Avro),
            "KAFKA" => Ok(Format::Kafka),
            "PROTOBUF" => Ok(Format::Protobuf),
            "PROTOBUF_NOSR" => Ok(Format::ProtobufNosr),
            _ => Err(ParseFormatError(s.to_owned())),
        }
    }
}

static IDENTIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9_]+$").unwrap());
static TOPIC_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").unwrap());

/// The desired configuration of a ksqlDB stream.
///
/// Every optional property that is left unset is omitted from the generated
/// `WITH` clause, letting the engine apply its own defaults.
#[derive(Clone, Debug, Default)]
pub struct StreamConfig {
    /// The name of the stream.
    pub name: String,
    /// The name of the Kafka topic that backs the stream. Required unless
    /// the stream is materialized from a query, in which case the engine
    /// derives the topic name.
    pub kafka_topic: Option<String>,
    /// The number of partitions in the backing topic.
    pub partitions: Option<i64>,
    /// The number of replicas in the backing topic.
    pub replicas: Option<i64>,
    /// The retention of the backing topic, in milliseconds.
    pub retention_ms: Option<i64>,
    /// The serialization format of the message key in the topic.
    pub key_format: Option<Format>,
    /// The serialization format of the message value in the topic.
    pub value_format: Option<Format>,
    /// The schema ID of the key schema in Schema Registry.
    pub key_schema_id: Option<i64>,
    /// The schema ID of the value schema in Schema Registry.
    pub value_schema_id: Option<i64>,
    /// A column to use as the source of `ROWTIME` for downstream queries.
    /// May be back-tick-quoted.
    pub timestamp: Option<String>,
    /// The type and format of the timestamp column. Write-only: the engine
    /// does not report it back.
    pub timestamp_format: Option<String>,
    /// Whether to create a read-only source stream. Source streams cannot
    /// be updated.
    pub source: bool,
    /// The SELECT statement this stream is materialized from.
    pub query: Option<String>,
    /// Properties to send as the `streamsProperties` parameter alongside
    /// the statement.
    pub properties: BTreeMap<String, String>,
}

impl StreamConfig {
    /// Creates a configuration for the named stream with every optional
    /// property unset.
    pub fn new<S>(name: S) -> StreamConfig
    where
        S: Into<String>,
    {
        StreamConfig {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Reports whether the stream is materialized from a query.
    pub fn is_materialized(&self) -> bool {
        self.query.is_some()
    }

    /// Checks the configuration against the constraints that ksqlDB imposes
    /// on stream properties.
    pub fn validate(&self) -> Result<(), ClientError> {
        validate_identifier(&self.name)?;
        if self.source && self.query.is_some() {
            return Err(ClientError::InvalidConfig(
                "the query attribute can't be used alongside the source attribute".into(),
            ));
        }
        match &self.kafka_topic {
            Some(topic) => validate_topic(topic)?,
            None => {
                if !self.is_materialized() {
                    return Err(ClientError::InvalidConfig(
                        "a kafka topic is required unless the stream is materialized from a query"
                            .into(),
                    ));
                }
            }
        }
        if let Some(query) = &self.query {
            validate_query(query)?;
        }
        for id in [self.key_schema_id, self.value_schema_id].into_iter().flatten() {
            if id < 1 {
                return Err(ClientError::InvalidConfig(format!(
                    "schema id must be at least 1, got {}",
                    id
                )));
            }
        }
        if let Some(timestamp) = &self.timestamp {
            validate_identifier(timestamp)?;
        }
        if self.timestamp_format.is_some() && self.timestamp.is_none() {
            return Err(ClientError::InvalidConfig(
                "timestamp_format requires the timestamp property".into(),
            ));
        }
        Ok(())
    }
}

/// Reports whether an identifier is enclosed in back-ticks.
fn is_backticked(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('`') && s.ends_with('`')
}

fn validate_identifier(s: &str) -> Result<(), ClientError> {
    if s.is_empty() {
        return Err(ClientError::InvalidConfig(
            "identifier must not be empty".into(),
        ));
    }
    if s.contains(';') {
        return Err(ClientError::InvalidConfig(format!(
            "the identifier '{}' must not contain a semicolon",
            s
        )));
    }
    // back-ticked identifiers can use any characters
    if is_backticked(s) {
        return Ok(());
    }
    if !IDENTIFIER_PATTERN.is_match(s) {
        return Err(ClientError::InvalidConfig(format!(
            "the identifier '{}' must only contain uppercase letters, numbers or underscore \
             if it is not enclosed by backticks",
            s
        )));
    }
    Ok(())
}

fn validate_topic(s: &str) -> Result<(), ClientError> {
    if s.len() > 255 {
        return Err(ClientError::InvalidConfig(format!(
            "the topic name '{}' is too long; must be up to 255 characters in length",
            s
        )));
    }
    if !TOPIC_PATTERN.is_match(s) {
        return Err(ClientError::InvalidConfig(format!(
            "the topic name '{}' is invalid; it can include the following characters: \
             a-z, A-Z, 0-9, . (dot), _ (underscore), and - (dash)",
            s
        )));
    }
    Ok(())
}

fn validate_query(s: &str) -> Result<(), ClientError> {
    // prevent injection
    if s.contains(';') {
        return Err(ClientError::InvalidConfig(
            "the query must not contain a semicolon".into(),
        ));
    }
    if !s.to_uppercase().starts_with("SELECT ") {
        return Err(ClientError::InvalidConfig(
            "the query must start with the SELECT keyword".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> StreamConfig {
        let mut config = StreamConfig::new("S1");
        config.kafka_topic = Some("t1".into());
        config
    }

    #[test]
    fn test_validate_ok() {
        base_config().validate().unwrap();

        let mut config = base_config();
        config.key_format = Some(Format::Json);
        config.value_format = Some(Format::Avro);
        config.partitions = Some(3);
        config.key_schema_id = Some(1);
        config.timestamp = Some("TS_COL".into());
        config.timestamp_format = Some("yyyy-MM-dd".into());
        config.validate().unwrap();

        // materialized streams may omit the topic
        let mut config = StreamConfig::new("S1");
        config.query = Some("SELECT * FROM S0 EMIT CHANGES".into());
        config.validate().unwrap();

        // a lowercase query is still a SELECT
        let mut config = base_config();
        config.query = Some("select * from s0".into());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_source_query_exclusive() {
        let mut config = base_config();
        config.source = true;
        config.query = Some("SELECT * FROM S0".into());
        match config.validate() {
            Err(ClientError::InvalidConfig(msg)) => {
                assert!(msg.contains("source"), "unexpected message: {}", msg)
            }
            res => panic!("expected InvalidConfig, got {:?}", res),
        }
    }

    #[test]
    fn test_validate_identifiers() {
        let mut config = base_config();
        config.name = "s1".into();
        assert!(config.validate().is_err());

        config.name = "S1; DROP STREAM S2".into();
        assert!(config.validate().is_err());

        config.name = "`lower case ok`".into();
        config.validate().unwrap();

        config.name = String::new();
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.timestamp = Some("ts_col".into());
        assert!(config.validate().is_err());
        config.timestamp = Some("`ts_col`".into());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_topic() {
        let mut config = base_config();
        config.kafka_topic = Some("a".repeat(256));
        assert!(config.validate().is_err());

        config.kafka_topic = Some("t/1".into());
        assert!(config.validate().is_err());

        config.kafka_topic = Some("orders.v1_raw-events".into());
        config.validate().unwrap();

        config.kafka_topic = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_query() {
        let mut config = base_config();
        config.query = Some("DELETE FROM S0".into());
        assert!(config.validate().is_err());

        config.query = Some("SELECT * FROM S0; DROP STREAM S1".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_schema_ids() {
        let mut config = base_config();
        config.key_schema_id = Some(0);
        assert!(config.validate().is_err());

        config.key_schema_id = Some(1);
        config.value_schema_id = Some(-1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_timestamp_format_requires_timestamp() {
        let mut config = base_config();
        config.timestamp_format = Some("yyyy-MM-dd".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_format_round_trip() {
        for (s, format) in [
            ("NONE", Format::None),
            ("DELIMITED", Format::Delimited),
            ("JSON", Format::Json),
            ("JSON_SR", Format::JsonSr),
            ("AVRO", Format::Avro),
            ("KAFKA", Format::Kafka),
            ("PROTOBUF", Format::Protobuf),
            ("PROTOBUF_NOSR", Format::ProtobufNosr),
        ] {
            assert_eq!(s.parse::<Format>().unwrap(), format);
            assert_eq!(format.to_string(), s);
        }
        assert!("CSV".parse::<Format>().is_err());
        assert!("json".parse::<Format>().is_err());
    }
}
