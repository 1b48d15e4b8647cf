//! Flattened image metadata records.
//!
//! A simplestreams product catalogue nests items inside versions inside
//! products. Lookups work on a flat view: every item becomes one record that
//! also carries the scalar fields of its version, product and catalogue.

use crate::error::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One image item with all inherited metadata fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRecord {
    fields: BTreeMap<String, String>,
}

impl ImageRecord {
    /// Build a record from explicit key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a metadata field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Serial of the image version this record belongs to.
    pub fn version_name(&self) -> Option<&str> {
        self.get("version_name")
    }

    fn absorb(&mut self, fields: &Map<String, Value>) {
        for (key, value) in fields {
            if let Some(text) = scalar(value) {
                self.fields.insert(key.clone(), text);
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Catalogue {
    #[serde(default)]
    products: BTreeMap<String, Product>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Product {
    #[serde(default)]
    versions: BTreeMap<String, Version>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Version {
    #[serde(default)]
    items: BTreeMap<String, Map<String, Value>>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Flatten a products catalogue document into one record per item.
///
/// Inner levels override outer ones. Each record also gets `product_name`,
/// `version_name` and `item_name`.
pub fn flatten_catalogue(document: Value) -> Result<Vec<ImageRecord>> {
    let catalogue: Catalogue = serde_json::from_value(document)?;
    let mut records = Vec::new();

    for (product_name, product) in &catalogue.products {
        for (version_name, version) in &product.versions {
            for (item_name, item) in &version.items {
                let mut record = ImageRecord::default();
                record.absorb(&catalogue.fields);
                record.absorb(&product.fields);
                record.absorb(&version.fields);
                record.absorb(item);
                record
                    .fields
                    .insert("product_name".into(), product_name.clone());
                record
                    .fields
                    .insert("version_name".into(), version_name.clone());
                record.fields.insert("item_name".into(), item_name.clone());
                records.push(record);
            }
        }
    }

    tracing::trace!(records = records.len(), "Flattened catalogue");
    Ok(records)
}
