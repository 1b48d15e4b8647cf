//! # cirrus-lxd
//!
//! Launch, clone, snapshot and delete LXD containers and virtual machines by
//! driving the `lxc` client, and resolve Ubuntu release names to image
//! fingerprints through the simplestreams index.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cirrus_lxd::{LaunchSpec, Lxd, LxdConfig, StreamsConfig};
//!
//! # async fn example() -> cirrus_lxd::Result<()> {
//! let lxd = Lxd::container(LxdConfig::from_env(), StreamsConfig::from_env())?;
//!
//! let image = lxd.released_image("noble", None).await?;
//! let instance = lxd.launch(&LaunchSpec::new(image).name("web-1"), true).await?;
//!
//! println!("{}", instance.execute("lsb_release -cs").await?);
//! instance.delete().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Every operation runs one `lxc` command or one index lookup. Nothing is
//! retried.

mod cloud;
mod command;
mod config;
mod error;
mod image;
mod instance;
mod keys;
mod profile;
mod release;
mod runner;
mod variant;

pub use cloud::Lxd;
pub use command::{prepare_command, qualify_image, LaunchSpec, USER_DATA_KEY};
pub use config::{LxdConfig, DEFAULT_DAILY_REMOTE, DEFAULT_RELEASES_REMOTE};
pub use error::{LxdError, Result};
pub use instance::Instance;
pub use keys::KeyPair;
pub use profile::{parse_profile_names, vm_profile};
pub use release::{
    codename_of, local_arch, release_hint, split_remote, ubuntu_arch, UBUNTU_RELEASES,
};
pub use runner::{CommandRunner, SystemRunner};
pub use variant::{
    Variant, CONTAINER_HASH_KEY, TRUSTY_CONTAINER_HASH_KEY, VM_HASH_KEY, XENIAL_VSOCK_IMAGE,
};

pub use cirrus_streams::{Filter, ImageIndex, ImageRecord, Stream, StreamsConfig};
