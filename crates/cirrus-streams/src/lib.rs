//! # cirrus-streams
//!
//! Filter-based lookups against a simplestreams image index, the catalogue
//! format Ubuntu cloud image mirrors publish.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cirrus_streams::{Filter, ImageIndex, SimplestreamsIndex, Stream, StreamsConfig};
//!
//! # async fn example() -> cirrus_streams::Result<()> {
//! let index = SimplestreamsIndex::new(StreamsConfig::default())?;
//!
//! let records = index
//!     .query(
//!         Stream::Daily,
//!         &[Filter::new("release", "noble"), Filter::new("arch", "amd64")],
//!     )
//!     .await?;
//!
//! if let Some(latest) = records.first() {
//!     println!("serial: {:?}", latest.version_name());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Only the product catalogue is read. Signatures, mirroring and delta syncs
//! are left to the simplestreams tooling.

mod config;
mod error;
mod filter;
mod index;
mod record;

pub use config::{Stream, StreamsConfig, DEFAULT_DAILY_MIRROR, DEFAULT_RELEASES_MIRROR};
pub use error::{Result, StreamsError};
pub use filter::Filter;
pub use index::{catalogue_path, select, ImageIndex, SimplestreamsIndex};
pub use record::{flatten_catalogue, ImageRecord};
