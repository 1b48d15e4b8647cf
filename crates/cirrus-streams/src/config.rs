//! Mirror configuration for the image index client.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use crate::error::{Result, StreamsError};
use std::fmt;
use std::time::Duration;

/// Default mirror for daily Ubuntu cloud images.
pub const DEFAULT_DAILY_MIRROR: &str = "https://cloud-images.ubuntu.com/daily";

/// Default mirror for released Ubuntu cloud images.
pub const DEFAULT_RELEASES_MIRROR: &str = "https://cloud-images.ubuntu.com/releases";

/// Which image stream to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Daily builds
    Daily,
    /// Released images
    Released,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Daily => write!(f, "daily"),
            Stream::Released => write!(f, "released"),
        }
    }
}

/// Configuration for [`SimplestreamsIndex`](crate::SimplestreamsIndex).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamsConfig {
    /// Base URL of the daily mirror.
    pub daily_url: String,

    /// Base URL of the released mirror.
    pub released_url: String,

    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            daily_url: DEFAULT_DAILY_MIRROR.into(),
            released_url: DEFAULT_RELEASES_MIRROR.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl StreamsConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `CIRRUS_DAILY_MIRROR` | `https://cloud-images.ubuntu.com/daily` |
    /// | `CIRRUS_RELEASES_MIRROR` | `https://cloud-images.ubuntu.com/releases` |
    /// | `CIRRUS_STREAMS_TIMEOUT_SECS` | `30` |
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            daily_url: std::env::var("CIRRUS_DAILY_MIRROR").unwrap_or(default.daily_url),
            released_url: std::env::var("CIRRUS_RELEASES_MIRROR")
                .unwrap_or(default.released_url),
            timeout: std::env::var("CIRRUS_STREAMS_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.timeout),
        }
    }

    /// Base URL of the mirror serving `stream`, without a trailing slash.
    pub fn mirror_url(&self, stream: Stream) -> &str {
        let url = match stream {
            Stream::Daily => &self.daily_url,
            Stream::Released => &self.released_url,
        };
        url.trim_end_matches('/')
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns an error if a mirror URL is not http(s) or the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        for url in [&self.daily_url, &self.released_url] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(StreamsError::Config(format!(
                    "mirror URL must be http(s), got '{url}'"
                )));
            }
        }

        if self.timeout.is_zero() {
            return Err(StreamsError::Config("timeout must be > 0".into()));
        }

        Ok(())
    }
}
