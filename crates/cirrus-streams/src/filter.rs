//! Equality filters over flattened image records.

use crate::error::StreamsError;
use crate::record::ImageRecord;
use std::fmt;
use std::str::FromStr;

/// A `key=value` constraint a record must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    key: String,
    value: String,
}

impl Filter {
    /// Create a filter requiring `key` to equal `value`.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Check whether the record carries `key` with exactly `value`.
    pub fn matches(&self, record: &ImageRecord) -> bool {
        record.get(&self.key) == Some(self.value.as_str())
    }
}

impl FromStr for Filter {
    type Err = StreamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(Self::new(key, value)),
            _ => Err(StreamsError::InvalidFilter(s.to_string())),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
