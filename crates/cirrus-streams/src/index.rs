//! Image index lookups.

use crate::config::{Stream, StreamsConfig};
use crate::error::{Result, StreamsError};
use crate::filter::Filter;
use crate::record::{flatten_catalogue, ImageRecord};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Location of the index document, relative to a mirror base URL.
const INDEX_PATH: &str = "streams/v1/index.json";

/// Datatype of the catalogue that lists downloadable images.
const IMAGE_DOWNLOADS: &str = "image-downloads";

/// Filter-based lookup over an image index.
///
/// Implementations return every record matching all filters, newest
/// `version_name` first.
#[async_trait]
pub trait ImageIndex: Send + Sync {
    /// Query `stream` for records matching every filter.
    async fn query(&self, stream: Stream, filters: &[Filter]) -> Result<Vec<ImageRecord>>;
}

/// Keep the records matching all filters, ordered newest version first.
pub fn select(records: Vec<ImageRecord>, filters: &[Filter]) -> Vec<ImageRecord> {
    let mut matching: Vec<ImageRecord> = records
        .into_iter()
        .filter(|record| filters.iter().all(|f| f.matches(record)))
        .collect();
    matching.sort_by(|a, b| b.version_name().cmp(&a.version_name()));
    matching
}

#[derive(Debug, Deserialize)]
struct IndexDocument {
    #[serde(default)]
    index: BTreeMap<String, IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    #[serde(default)]
    datatype: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

/// Find the path of the image-downloads catalogue in an index document.
pub fn catalogue_path(index: Value, index_url: &str) -> Result<String> {
    let document: IndexDocument = serde_json::from_value(index)?;
    document
        .index
        .into_values()
        .find(|entry| entry.datatype.as_deref() == Some(IMAGE_DOWNLOADS))
        .and_then(|entry| entry.path)
        .ok_or_else(|| StreamsError::MissingCatalogue(index_url.to_string()))
}

/// URL of the index document on `mirror`.
fn index_url(mirror: &str) -> String {
    format!("{}/{INDEX_PATH}", mirror.trim_end_matches('/'))
}

/// URL of a catalogue whose index `path` is relative to `mirror`.
fn catalogue_url(mirror: &str, path: &str) -> String {
    format!(
        "{}/{}",
        mirror.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Image index backed by a simplestreams HTTP mirror.
#[derive(Debug, Clone)]
pub struct SimplestreamsIndex {
    client: reqwest::Client,
    config: StreamsConfig,
}

impl SimplestreamsIndex {
    /// Create a client for the configured mirrors.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: StreamsConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    async fn fetch_json(&self, url: &str) -> Result<Value> {
        tracing::debug!(%url, "Fetching simplestreams document");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ImageIndex for SimplestreamsIndex {
    async fn query(&self, stream: Stream, filters: &[Filter]) -> Result<Vec<ImageRecord>> {
        let mirror = self.config.mirror_url(stream);
        let index_url = index_url(mirror);

        let index = self.fetch_json(&index_url).await?;
        let path = catalogue_path(index, &index_url)?;
        let catalogue = self.fetch_json(&catalogue_url(mirror, &path)).await?;

        let records = select(flatten_catalogue(catalogue)?, filters);
        tracing::debug!(
            %stream,
            filters = ?filters.iter().map(ToString::to_string).collect::<Vec<_>>(),
            matches = records.len(),
            "Image index query completed"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalogue_path() {
        let index = json!({
            "format": "index:1.0",
            "index": {
                "com.ubuntu.cloud:daily:aws": {
                    "datatype": "image-ids",
                    "path": "streams/v1/com.ubuntu.cloud:daily:aws.json"
                },
                "com.ubuntu.cloud:daily:download": {
                    "datatype": "image-downloads",
                    "path": "streams/v1/com.ubuntu.cloud:daily:download.json"
                }
            }
        });
        let path = catalogue_path(index, "http://mirror/streams/v1/index.json").unwrap();
        assert_eq!(path, "streams/v1/com.ubuntu.cloud:daily:download.json");
    }

    #[test]
    fn test_catalogue_path_missing() {
        let index = json!({"index": {}});
        let err = catalogue_path(index, "http://mirror/index.json").unwrap_err();
        assert!(matches!(err, StreamsError::MissingCatalogue(_)));
    }

    #[test]
    fn test_index_url() {
        assert_eq!(
            index_url("https://cloud-images.ubuntu.com/daily"),
            "https://cloud-images.ubuntu.com/daily/streams/v1/index.json"
        );
        assert_eq!(
            index_url("http://mirror.local/releases/"),
            "http://mirror.local/releases/streams/v1/index.json"
        );
    }

    #[test]
    fn test_catalogue_url() {
        let path = "streams/v1/com.ubuntu.cloud:daily:download.json";
        let expected = "http://mirror.local/daily/streams/v1/com.ubuntu.cloud:daily:download.json";

        assert_eq!(catalogue_url("http://mirror.local/daily", path), expected);
        assert_eq!(catalogue_url("http://mirror.local/daily/", path), expected);
        assert_eq!(
            catalogue_url("http://mirror.local/daily", &format!("/{path}")),
            expected
        );
    }

    #[test]
    fn test_urls_from_config_mirror() {
        let config = StreamsConfig {
            released_url: "http://mirror.local/releases//".into(),
            ..Default::default()
        };
        let mirror = config.mirror_url(Stream::Released);
        assert_eq!(
            index_url(mirror),
            "http://mirror.local/releases/streams/v1/index.json"
        );
    }

    #[test]
    fn test_select_filters_and_orders_newest_first() {
        let records = vec![
            ImageRecord::from_pairs([("release", "focal"), ("version_name", "20240101")]),
            ImageRecord::from_pairs([("release", "bionic"), ("version_name", "20240301")]),
            ImageRecord::from_pairs([("release", "focal"), ("version_name", "20240201")]),
        ];

        let selected = select(records, &[Filter::new("release", "focal")]);
        let versions: Vec<_> = selected.iter().filter_map(|r| r.version_name()).collect();
        assert_eq!(versions, vec!["20240201", "20240101"]);
    }

    #[test]
    fn test_select_without_filters_keeps_everything() {
        let records = vec![ImageRecord::from_pairs([("version_name", "1")])];
        assert_eq!(select(records, &[]).len(), 1);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = StreamsConfig {
            daily_url: "mirror.local".into(),
            ..Default::default()
        };
        assert!(SimplestreamsIndex::new(config).is_err());
    }
}
