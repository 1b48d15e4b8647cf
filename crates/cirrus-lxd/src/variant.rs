//! Per-variant image policy.
//!
//! Containers and virtual machines boot different artifacts from the same
//! lxd.tar.xz index item, so each variant reads a different hash field.

use crate::error::{LxdError, Result};
use std::fmt;

/// Hash field of container images.
pub const CONTAINER_HASH_KEY: &str = "combined_squashfs_sha256";

/// Hash field of trusty container images, which predate squashfs.
pub const TRUSTY_CONTAINER_HASH_KEY: &str = "combined_rootxz_sha256";

/// Hash field of virtual machine images.
pub const VM_HASH_KEY: &str = "combined_disk1-img_sha256";

/// Xenial VM image carrying the HWE kernel, which has vhost-vsock support
/// for the LXD agent.
pub const XENIAL_VSOCK_IMAGE: &str = "images:ubuntu/16.04/cloud";

/// Kind of instance to manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variant {
    /// System container
    #[default]
    Container,
    /// Virtual machine
    VirtualMachine,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Container => write!(f, "container"),
            Variant::VirtualMachine => write!(f, "virtual-machine"),
        }
    }
}

impl Variant {
    pub fn is_vm(self) -> bool {
        self == Variant::VirtualMachine
    }

    /// Metadata key holding the fingerprint to launch `release` with.
    pub fn hash_key(self, release: Option<&str>) -> &'static str {
        match (self, release) {
            (Variant::Container, Some("trusty")) => TRUSTY_CONTAINER_HASH_KEY,
            (Variant::Container, _) => CONTAINER_HASH_KEY,
            (Variant::VirtualMachine, _) => VM_HASH_KEY,
        }
    }

    /// Image to use for `release` without consulting the index, if any.
    ///
    /// # Errors
    /// Returns [`LxdError::UnsupportedRelease`] for trusty virtual machines.
    pub fn pinned_image(self, release: &str) -> Result<Option<&'static str>> {
        match (self, release) {
            (Variant::VirtualMachine, "xenial") => Ok(Some(XENIAL_VSOCK_IMAGE)),
            (Variant::VirtualMachine, "trusty") => Err(LxdError::UnsupportedRelease {
                release: release.to_string(),
                vm: true,
            }),
            _ => Ok(None),
        }
    }

    /// Extra flag `lxc init` needs for this variant.
    pub fn launch_flag(self) -> Option<&'static str> {
        match self {
            Variant::Container => None,
            Variant::VirtualMachine => Some("--vm"),
        }
    }
}
