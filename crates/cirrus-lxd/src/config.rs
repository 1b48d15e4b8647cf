//! Configuration for the LXD client.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use crate::error::{LxdError, Result};
use crate::release::local_arch;

/// Remote serving daily Ubuntu images.
pub const DEFAULT_DAILY_REMOTE: &str = "ubuntu-daily";

/// Remote serving released Ubuntu images.
pub const DEFAULT_RELEASES_REMOTE: &str = "ubuntu";

/// Configuration for [`Lxd`](crate::Lxd).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LxdConfig {
    /// Name or path of the `lxc` client binary.
    pub lxc_binary: String,

    /// Remote prefixed to image ids that carry none.
    pub daily_remote: String,

    /// Remote used for released images.
    pub releases_remote: String,

    /// Ubuntu architecture name used for image lookups.
    pub arch: String,

    /// Prefix of the per-release VM profiles.
    pub profile_prefix: String,
}

impl Default for LxdConfig {
    fn default() -> Self {
        Self {
            lxc_binary: "lxc".into(),
            daily_remote: DEFAULT_DAILY_REMOTE.into(),
            releases_remote: DEFAULT_RELEASES_REMOTE.into(),
            arch: local_arch().into(),
            profile_prefix: "cirrus-vm".into(),
        }
    }
}

impl LxdConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `CIRRUS_LXC` | `lxc` |
    /// | `CIRRUS_DAILY_REMOTE` | `ubuntu-daily` |
    /// | `CIRRUS_RELEASES_REMOTE` | `ubuntu` |
    /// | `CIRRUS_ARCH` | host architecture (`amd64`, `arm64`, ...) |
    /// | `CIRRUS_PROFILE_PREFIX` | `cirrus-vm` |
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            lxc_binary: std::env::var("CIRRUS_LXC").unwrap_or(default.lxc_binary),
            daily_remote: std::env::var("CIRRUS_DAILY_REMOTE").unwrap_or(default.daily_remote),
            releases_remote: std::env::var("CIRRUS_RELEASES_REMOTE")
                .unwrap_or(default.releases_remote),
            arch: std::env::var("CIRRUS_ARCH").unwrap_or(default.arch),
            profile_prefix: std::env::var("CIRRUS_PROFILE_PREFIX")
                .unwrap_or(default.profile_prefix),
        }
    }

    /// Name of the VM profile for a release.
    pub fn profile_name(&self, release: &str) -> String {
        format!("{}-{}", self.profile_prefix, release)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns an error if a field is empty or a remote name contains `:`.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("lxc_binary", &self.lxc_binary),
            ("daily_remote", &self.daily_remote),
            ("releases_remote", &self.releases_remote),
            ("arch", &self.arch),
            ("profile_prefix", &self.profile_prefix),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(LxdError::Config(format!("{field} must not be empty")));
            }
        }

        for remote in [&self.daily_remote, &self.releases_remote] {
            if remote.contains(':') {
                return Err(LxdError::Config(format!(
                    "remote name must not contain ':', got '{remote}'"
                )));
            }
        }

        if self.daily_remote == self.releases_remote {
            return Err(LxdError::Config(
                "daily and releases remotes must differ".into(),
            ));
        }

        Ok(())
    }
}
