//! Handle to a single LXD instance.

use crate::error::Result;
use crate::keys::KeyPair;
use crate::runner::CommandRunner;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A container or virtual machine known to LXD.
///
/// Every operation is one `lxc` invocation; nothing is cached locally.
#[derive(Clone)]
pub struct Instance {
    name: String,
    key_pair: Option<KeyPair>,
    lxc: String,
    runner: Arc<dyn CommandRunner>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name)
            .field("key_pair", &self.key_pair)
            .field("lxc", &self.lxc)
            .finish_non_exhaustive()
    }
}

impl Instance {
    pub(crate) fn new(
        name: impl Into<String>,
        lxc: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
        key_pair: Option<KeyPair>,
    ) -> Self {
        Self {
            name: name.into(),
            key_pair,
            lxc: lxc.into(),
            runner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key pair authorized on this instance, if known.
    pub fn key_pair(&self) -> Option<&KeyPair> {
        self.key_pair.as_ref()
    }

    pub(crate) fn set_key_pair(&mut self, key_pair: Option<KeyPair>) {
        self.key_pair = key_pair;
    }

    async fn lxc(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Vec::with_capacity(args.len() + 1);
        cmd.push(self.lxc.clone());
        cmd.extend(args.iter().map(|arg| arg.to_string()));
        self.runner.run(&cmd, None).await
    }

    /// Start the instance, optionally waiting for cloud-init to finish.
    pub async fn start(&self, wait: bool) -> Result<()> {
        tracing::info!(name = %self.name, "Starting instance");
        self.lxc(&["start", self.name.as_str()]).await?;

        if wait {
            self.wait().await?;
        }
        Ok(())
    }

    /// Stop the instance.
    pub async fn stop(&self) -> Result<()> {
        tracing::info!(name = %self.name, "Stopping instance");
        self.lxc(&["stop", self.name.as_str()]).await?;
        Ok(())
    }

    /// Delete the instance, stopping it first if running.
    pub async fn delete(&self) -> Result<()> {
        tracing::info!(name = %self.name, "Deleting instance");
        self.lxc(&["delete", self.name.as_str(), "--force"]).await?;
        Ok(())
    }

    /// Block until cloud-init reports a final status.
    pub async fn wait(&self) -> Result<()> {
        tracing::debug!(name = %self.name, "Waiting for cloud-init");
        self.execute_argv(&["cloud-init", "status", "--wait"]).await?;
        Ok(())
    }

    /// Run a shell command inside the instance and return its stdout.
    pub async fn execute(&self, command: &str) -> Result<String> {
        self.execute_argv(&["sh", "-c", command]).await
    }

    async fn execute_argv(&self, argv: &[&str]) -> Result<String> {
        let mut args = vec!["exec", self.name.as_str(), "--"];
        args.extend_from_slice(argv);
        self.lxc(&args).await
    }

    /// Copy a file out of the instance.
    pub async fn pull_file(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        let source = format!("{}/{}", self.name, remote_path.trim_start_matches('/'));
        let target = local_path.to_string_lossy().into_owned();
        tracing::debug!(%source, target = %target, "Pulling file");
        self.lxc(&["file", "pull", source.as_str(), target.as_str()]).await?;
        Ok(())
    }

    /// Reset cloud-init state so the next boot runs it from scratch.
    pub async fn clean(&self) -> Result<()> {
        tracing::debug!(name = %self.name, "Cleaning cloud-init state");
        self.execute_argv(&["cloud-init", "clean", "--logs"]).await?;
        Ok(())
    }

    /// Take a snapshot.
    ///
    /// # Returns
    /// `<instance>/<snapshot>`, which can be used as a clone source.
    pub async fn snapshot(&self, snapshot_name: &str) -> Result<String> {
        tracing::info!(name = %self.name, snapshot = %snapshot_name, "Creating snapshot");
        self.lxc(&["snapshot", self.name.as_str(), snapshot_name]).await?;
        Ok(format!("{}/{}", self.name, snapshot_name))
    }
}
