//! `lxc init` argument construction.

use crate::config::LxdConfig;
use crate::error::{LxdError, Result};
use crate::keys::KeyPair;
use crate::variant::Variant;
use std::collections::BTreeMap;

/// Config key cloud-init reads user data from.
pub const USER_DATA_KEY: &str = "user.user-data";

/// Parameters for initializing or launching an instance.
///
/// # Example
///
/// ```
/// use cirrus_lxd::LaunchSpec;
///
/// let spec = LaunchSpec::new("ubuntu:jammy")
///     .name("web-1")
///     .ephemeral()
///     .profile("default")
///     .config("limits.cpu", "2");
///
/// assert_eq!(spec.name.as_deref(), Some("web-1"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchSpec {
    /// `[<remote>:]<image>`; the daily remote is assumed when absent
    pub image: String,
    /// Instance name; LXD picks one when absent
    pub name: Option<String>,
    /// Delete the instance when it stops
    pub ephemeral: bool,
    /// Network to attach
    pub network: Option<String>,
    /// Storage pool for the root disk
    pub storage: Option<String>,
    /// Instance type (e.g. `c2-m4`)
    pub instance_type: Option<String>,
    /// Profiles to apply, in order
    pub profiles: Vec<String>,
    /// cloud-init user data
    pub user_data: Option<String>,
    /// Instance config keys, emitted in key order
    pub config: BTreeMap<String, String>,
}

impl LaunchSpec {
    /// Create a spec for the given image.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn storage(mut self, storage: impl Into<String>) -> Self {
        self.storage = Some(storage.into());
        self
    }

    pub fn instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = Some(instance_type.into());
        self
    }

    /// Append a profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profiles.push(profile.into());
        self
    }

    pub fn user_data(mut self, user_data: impl Into<String>) -> Self {
        self.user_data = Some(user_data.into());
        self
    }

    /// Set an instance config key.
    pub fn config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// Image reference with the daily remote filled in when none is given.
pub fn qualify_image(image: &str, daily_remote: &str) -> String {
    if image.contains(':') {
        image.to_string()
    } else {
        format!("{daily_remote}:{image}")
    }
}

/// Build the `lxc init` invocation for `spec`.
///
/// Profiles are taken as given; virtual machine profiles must already be
/// resolved by the caller.
///
/// # Errors
/// Returns [`LxdError::ConflictingUserData`] when user data is supplied both
/// directly and through the `user.user-data` config key.
pub fn prepare_command(
    spec: &LaunchSpec,
    variant: Variant,
    config: &LxdConfig,
    key_pair: Option<&KeyPair>,
) -> Result<Vec<String>> {
    let image = qualify_image(&spec.image, &config.daily_remote);
    tracing::debug!(%image, "Full release to launch");

    let mut user_data = spec.user_data.clone().filter(|data| !data.is_empty());
    let mut instance_config = spec.config.clone();

    if let Some(key_pair) = key_pair {
        let block = key_pair.authorized_keys_block();
        let mut merged = false;

        if let Some(data) = user_data.as_mut() {
            data.push('\n');
            data.push_str(&block);
            merged = true;
        }
        if let Some(data) = instance_config.get_mut(USER_DATA_KEY) {
            data.push('\n');
            data.push_str(&block);
            merged = true;
        }
        if !merged {
            user_data = Some(format!("#cloud-config\n{block}"));
        }
    }

    let mut cmd = vec![config.lxc_binary.clone(), "init".into(), image];

    if let Some(name) = spec.name.as_deref().filter(|n| !n.is_empty()) {
        cmd.push(name.to_string());
    }

    if spec.ephemeral {
        cmd.push("--ephemeral".into());
    }

    let options = [
        ("--network", &spec.network),
        ("--storage", &spec.storage),
        ("--type", &spec.instance_type),
    ];
    for (flag, value) in options {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            cmd.push(flag.into());
            cmd.push(value.to_string());
        }
    }

    for profile in &spec.profiles {
        cmd.push("--profile".into());
        cmd.push(profile.clone());
    }

    for (key, value) in &instance_config {
        cmd.push("--config".into());
        cmd.push(format!("{key}={value}"));
    }

    if let Some(data) = user_data {
        if instance_config.contains_key(USER_DATA_KEY) {
            return Err(LxdError::ConflictingUserData);
        }
        cmd.push("--config".into());
        cmd.push(format!("{USER_DATA_KEY}={data}"));
    }

    if let Some(flag) = variant.launch_flag() {
        cmd.push(flag.into());
    }

    Ok(cmd)
}
