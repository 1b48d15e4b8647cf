//! LXD profiles required to boot Ubuntu virtual machines.

use crate::cloud::Lxd;
use crate::error::{LxdError, Result};
use crate::release::codename_of;

/// Device exposing cloud-init config to the VM, used by the LXD agent.
const CONFIG_DISK: &str = "devices:
  config:
    source: cloud-init:config
    type: disk
";

/// Xenial cloud images ship without the LXD agent; vendor-data installs it
/// from the config drive over 9p.
const XENIAL_VENDOR_DATA: &str = "config:
  user.vendor-data: |
    #cloud-config
    runcmd:
      - mount -t 9p config /mnt
      - cd /mnt
      - ./install.sh
      - cd /
      - umount /mnt
      - systemctl start lxd-agent-9p lxd-agent
";

/// Profile body for virtual machines of `release`.
///
/// Returns `None` for releases that cannot run as LXD virtual machines.
pub fn vm_profile(release: &str) -> Option<String> {
    match codename_of(release)? {
        "trusty" => None,
        "xenial" => Some(format!(
            "{XENIAL_VENDOR_DATA}description: Ubuntu xenial LXD virtual machine\n{CONFIG_DISK}"
        )),
        codename => Some(format!(
            "config: {{}}\ndescription: Ubuntu {codename} LXD virtual machine\n{CONFIG_DISK}"
        )),
    }
}

/// Profile names from `lxc profile list --format csv` output.
pub fn parse_profile_names(csv: &str) -> Vec<String> {
    csv.lines()
        .filter_map(|line| line.split(',').next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

impl Lxd {
    /// Create a profile and load `body` into it.
    ///
    /// An existing profile is left alone unless `force` is set, in which case
    /// it is deleted and recreated.
    ///
    /// # Returns
    /// `true` if the profile was (re)created.
    pub async fn create_profile(&self, name: &str, body: &str, force: bool) -> Result<bool> {
        let listing = self
            .lxc(&["profile", "list", "--format", "csv"], None)
            .await?;
        let exists = parse_profile_names(&listing).iter().any(|p| p == name);

        if exists {
            if !force {
                tracing::debug!(profile = %name, "Profile already exists");
                return Ok(false);
            }
            tracing::debug!(profile = %name, "Deleting current profile");
            self.lxc(&["profile", "delete", name], None).await?;
        }

        tracing::debug!(profile = %name, "Creating profile");
        self.lxc(&["profile", "create", name], None).await?;
        self.lxc(&["profile", "edit", name], Some(body)).await?;

        Ok(true)
    }

    /// Create the profile a virtual machine of `image_id`'s release needs.
    ///
    /// # Returns
    /// The profile list to launch with.
    ///
    /// # Errors
    /// Returns [`LxdError::UnsupportedRelease`] when no profile exists for
    /// the release.
    pub async fn build_necessary_profiles(&self, image_id: &str) -> Result<Vec<String>> {
        let release = self.extract_release(image_id).await?;
        let body = vm_profile(&release).ok_or_else(|| LxdError::UnsupportedRelease {
            release: release.clone(),
            vm: true,
        })?;

        let name = self.config().profile_name(&release);
        self.create_profile(&name, &body, false).await?;

        Ok(vec![name])
    }
}
