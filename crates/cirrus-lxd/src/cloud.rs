//! The `Lxd` entry point and instance lifecycle operations.

use crate::command::{self, LaunchSpec};
use crate::config::LxdConfig;
use crate::error::{LxdError, Result};
use crate::instance::Instance;
use crate::keys::KeyPair;
use crate::runner::{CommandRunner, SystemRunner};
use crate::variant::Variant;
use cirrus_streams::{ImageIndex, SimplestreamsIndex, StreamsConfig};
use std::fmt;
use std::sync::Arc;

/// Marker `lxc init` prints before a generated instance name.
const GENERATED_NAME_MARKER: &str = "Instance name is: ";

/// Authorized keys file of the default cloud image user.
const AUTHORIZED_KEYS_PATH: &str = "/home/ubuntu/.ssh/authorized_keys";

/// Client for one LXD instance variant.
///
/// Commands go through a [`CommandRunner`] and image lookups through an
/// [`ImageIndex`]; both are injectable for testing.
pub struct Lxd {
    variant: Variant,
    config: LxdConfig,
    key_pair: Option<KeyPair>,
    runner: Arc<dyn CommandRunner>,
    index: Arc<dyn ImageIndex>,
}

impl fmt::Debug for Lxd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lxd")
            .field("variant", &self.variant)
            .field("config", &self.config)
            .field("key_pair", &self.key_pair)
            .finish_non_exhaustive()
    }
}

impl Lxd {
    /// Create a client that runs the local `lxc` binary and queries the
    /// configured simplestreams mirrors.
    ///
    /// # Errors
    /// Returns an error if either configuration is invalid.
    pub fn new(variant: Variant, config: LxdConfig, streams: StreamsConfig) -> Result<Self> {
        config.validate()?;
        let index = SimplestreamsIndex::new(streams)?;
        Ok(Self::with_backends(
            variant,
            config,
            Arc::new(SystemRunner),
            Arc::new(index),
        ))
    }

    /// Client for system containers.
    pub fn container(config: LxdConfig, streams: StreamsConfig) -> Result<Self> {
        Self::new(Variant::Container, config, streams)
    }

    /// Client for virtual machines.
    pub fn virtual_machine(config: LxdConfig, streams: StreamsConfig) -> Result<Self> {
        Self::new(Variant::VirtualMachine, config, streams)
    }

    /// Create a client over explicit backends.
    pub fn with_backends(
        variant: Variant,
        config: LxdConfig,
        runner: Arc<dyn CommandRunner>,
        index: Arc<dyn ImageIndex>,
    ) -> Self {
        Self {
            variant,
            config,
            key_pair: None,
            runner,
            index,
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn config(&self) -> &LxdConfig {
        &self.config
    }

    pub fn key_pair(&self) -> Option<&KeyPair> {
        self.key_pair.as_ref()
    }

    /// Authorize `key_pair` on every instance launched from now on.
    pub fn use_key_pair(&mut self, key_pair: KeyPair) {
        self.key_pair = Some(key_pair);
    }

    pub(crate) fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    pub(crate) fn index(&self) -> &Arc<dyn ImageIndex> {
        &self.index
    }

    /// Run `lxc` with the given arguments.
    pub(crate) async fn lxc(&self, args: &[&str], stdin: Option<&str>) -> Result<String> {
        let mut cmd = Vec::with_capacity(args.len() + 1);
        cmd.push(self.config.lxc_binary.clone());
        cmd.extend(args.iter().map(|arg| arg.to_string()));
        self.runner.run(&cmd, stdin).await
    }

    fn instance(&self, name: impl Into<String>, key_pair: Option<KeyPair>) -> Instance {
        Instance::new(
            name,
            self.config.lxc_binary.clone(),
            Arc::clone(&self.runner),
            key_pair,
        )
    }

    /// Build the `lxc init` invocation for `spec`.
    ///
    /// Virtual machines launched without profiles get the per-release
    /// profile, which is created on demand.
    pub async fn prepare_command(&self, spec: &LaunchSpec) -> Result<Vec<String>> {
        if self.variant.is_vm() && spec.profiles.is_empty() {
            let mut spec = spec.clone();
            spec.profiles = self.build_necessary_profiles(&spec.image).await?;
            return command::prepare_command(
                &spec,
                self.variant,
                &self.config,
                self.key_pair.as_ref(),
            );
        }

        command::prepare_command(spec, self.variant, &self.config, self.key_pair.as_ref())
    }

    /// Create an instance without starting it.
    pub async fn init(&self, spec: &LaunchSpec) -> Result<Instance> {
        let cmd = self.prepare_command(spec).await?;
        tracing::info!(command = ?cmd, "Initializing instance");

        let output = self.runner.run(&cmd, None).await?;

        let name = match spec.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => generated_name(&output)?,
        };

        tracing::debug!(%name, variant = %self.variant, "Created instance");
        Ok(self.instance(name, self.key_pair.clone()))
    }

    /// Create and start an instance.
    pub async fn launch(&self, spec: &LaunchSpec, wait: bool) -> Result<Instance> {
        let instance = self.init(spec).await?;
        instance.start(wait).await?;
        Ok(instance)
    }

    /// Copy an instance, or a snapshot given as `instance/snapshot`.
    pub async fn clone_instance(&self, base: &str, new_name: &str) -> Result<Instance> {
        tracing::debug!(%base, %new_name, "Cloning instance");
        self.lxc(&["copy", base, new_name], None).await?;
        Ok(self.instance(new_name, None))
    }

    /// Delete an instance, stopping it first if running.
    pub async fn delete_instance(&self, name: &str) -> Result<()> {
        self.instance(name, None).delete().await
    }

    /// Get a handle to an existing instance.
    ///
    /// With a key pair configured, the instance's authorized keys are staged
    /// locally and the key pair is attached only if it is listed there.
    pub async fn get_instance(&self, name: &str) -> Result<Instance> {
        let mut instance = self.instance(name, None);

        if let Some(key_pair) = &self.key_pair {
            let staging = tempfile::tempdir()?;
            let local_path = staging.path().join(format!("{name}-authorized-keys"));

            instance.pull_file(AUTHORIZED_KEYS_PATH, &local_path).await?;
            let authorized = tokio::fs::read_to_string(&local_path).await?;

            if key_pair.is_authorized_in(&authorized) {
                instance.set_key_pair(Some(key_pair.clone()));
            }
        }

        Ok(instance)
    }

    /// Snapshot an instance for later cloning.
    ///
    /// # Returns
    /// The snapshot reference `instance/snapshot`.
    pub async fn snapshot(
        &self,
        instance: &Instance,
        clean: bool,
        name: Option<&str>,
    ) -> Result<String> {
        if clean {
            instance.clean().await?;
        }

        let snapshot_name = match name.filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => format!("{}-snapshot", instance.name()),
        };
        instance.snapshot(&snapshot_name).await
    }

    /// Delete an image from the local image store.
    pub async fn delete_image(&self, image_id: &str) -> Result<()> {
        tracing::debug!(%image_id, "Deleting image");
        self.lxc(&["image", "delete", image_id], None).await?;
        tracing::debug!(%image_id, "Deleted image");
        Ok(())
    }
}

/// Extract the instance name `lxc init` generated.
fn generated_name(output: &str) -> Result<String> {
    output
        .split_once(GENERATED_NAME_MARKER)
        .map(|(_, rest)| rest.trim())
        .and_then(|rest| rest.split_whitespace().next())
        .map(str::to_string)
        .ok_or_else(|| {
            LxdError::UnexpectedOutput(format!(
                "no generated instance name in lxc output: {}",
                output.trim()
            ))
        })
}
