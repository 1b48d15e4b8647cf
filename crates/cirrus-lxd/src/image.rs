//! Ubuntu image resolution against the simplestreams index.

use crate::cloud::Lxd;
use crate::error::{LxdError, Result};
use crate::release::{codename_of, release_hint, split_remote};
use crate::variant::{Variant, CONTAINER_HASH_KEY, TRUSTY_CONTAINER_HASH_KEY, XENIAL_VSOCK_IMAGE};
use cirrus_streams::{Filter, ImageRecord, Stream};

impl Lxd {
    /// Latest released image for `release`, as `<releases-remote>:<fingerprint>`.
    ///
    /// `arch` defaults to the configured architecture.
    pub async fn released_image(&self, release: &str, arch: Option<&str>) -> Result<String> {
        tracing::debug!(%release, "Finding released Ubuntu image");
        let remote = self.config().releases_remote.clone();
        self.search_for_image(&remote, Stream::Released, release, arch)
            .await
    }

    /// Latest daily image for `release`, as `<daily-remote>:<fingerprint>`.
    pub async fn daily_image(&self, release: &str, arch: Option<&str>) -> Result<String> {
        tracing::debug!(%release, "Finding daily Ubuntu image");
        let remote = self.config().daily_remote.clone();
        self.search_for_image(&remote, Stream::Daily, release, arch)
            .await
    }

    /// Resolve `release` to an image reference on `remote`.
    ///
    /// # Errors
    /// - [`LxdError::UnsupportedRelease`] for releases the variant cannot boot
    /// - [`LxdError::NoImageFound`] when the index has no matching image
    /// - [`LxdError::MissingHashKey`] when the record lacks the variant's hash
    pub async fn search_for_image(
        &self,
        remote: &str,
        stream: Stream,
        release: &str,
        arch: Option<&str>,
    ) -> Result<String> {
        let release = codename_of(release).unwrap_or(release);

        if let Some(image) = self.variant().pinned_image(release)? {
            tracing::debug!(%release, %image, "Using pinned image for lxd-agent support");
            return Ok(image.to_string());
        }

        let record = self.find_image(release, arch, stream).await?;
        let key = self.variant().hash_key(Some(release));
        let fingerprint = record.get(key).ok_or_else(|| LxdError::MissingHashKey {
            image: format!("{release} ({stream})"),
            key: key.to_string(),
        })?;

        Ok(format!("{remote}:{fingerprint}"))
    }

    /// Newest `lxd.tar.xz` record for `release` on `stream`.
    pub async fn find_image(
        &self,
        release: &str,
        arch: Option<&str>,
        stream: Stream,
    ) -> Result<ImageRecord> {
        let arch = arch.unwrap_or(self.config().arch.as_str());
        let filters = [
            Filter::new("datatype", "image-downloads"),
            Filter::new("ftype", "lxd.tar.xz"),
            Filter::new("arch", arch),
            Filter::new("release", release),
        ];

        let records = self.index().query(stream, &filters).await?;
        tracing::trace!(%release, %arch, %stream, matches = records.len(), "Queried image index");

        records
            .into_iter()
            .next()
            .ok_or_else(|| LxdError::NoImageFound(format!("{release} on {arch} ({stream})")))
    }

    /// Index records describing `image_id` (`[<remote>:]<fingerprint>`).
    ///
    /// With no explicit `hash_key`, containers look the fingerprint up as a
    /// squashfs image and then as a trusty rootxz image.
    ///
    /// # Errors
    /// Returns [`LxdError::UnknownRemote`] when the remote is neither the
    /// daily nor the releases remote.
    pub async fn image_info(
        &self,
        image_id: &str,
        hash_key: Option<&str>,
    ) -> Result<Vec<ImageRecord>> {
        let (remote, fingerprint) = split_remote(image_id);
        let stream = match remote {
            None => Stream::Daily,
            Some(r) if r == self.config().releases_remote => Stream::Released,
            Some(r) if r == self.config().daily_remote => Stream::Daily,
            Some(r) => return Err(LxdError::UnknownRemote(r.to_string())),
        };

        match (hash_key, self.variant()) {
            (Some(key), _) => self.query_fingerprint(stream, key, fingerprint).await,
            (None, Variant::Container) => {
                let records = self
                    .query_fingerprint(stream, CONTAINER_HASH_KEY, fingerprint)
                    .await?;
                if !records.is_empty() {
                    return Ok(records);
                }
                self.query_fingerprint(stream, TRUSTY_CONTAINER_HASH_KEY, fingerprint)
                    .await
            }
            (None, variant) => {
                self.query_fingerprint(stream, variant.hash_key(None), fingerprint)
                    .await
            }
        }
    }

    async fn query_fingerprint(
        &self,
        stream: Stream,
        key: &str,
        fingerprint: &str,
    ) -> Result<Vec<ImageRecord>> {
        let filters = [Filter::new(key, fingerprint)];
        Ok(self.index().query(stream, &filters).await?)
    }

    /// Serial (`version_name`) of an image.
    ///
    /// Returns `None` for the pinned xenial VM image, which is not served by
    /// the index.
    pub async fn image_serial(&self, image_id: &str) -> Result<Option<String>> {
        tracing::debug!(%image_id, "Finding image serial");

        if self.variant().is_vm() && image_id == XENIAL_VSOCK_IMAGE {
            return Ok(None);
        }

        self.image_info(image_id, None)
            .await?
            .first()
            .and_then(ImageRecord::version_name)
            .map(|serial| Some(serial.to_string()))
            .ok_or_else(|| LxdError::NoImageFound(image_id.to_string()))
    }

    /// Ubuntu codename an image id refers to.
    ///
    /// Release names and `ubuntu/<version>` style ids resolve locally;
    /// fingerprints are looked up in the index.
    pub async fn extract_release(&self, image_id: &str) -> Result<String> {
        if let Some(codename) = release_hint(image_id) {
            return Ok(codename.to_string());
        }

        self.image_info(image_id, None)
            .await?
            .first()
            .and_then(|record| record.get("release"))
            .map(str::to_string)
            .ok_or_else(|| LxdError::NoImageFound(image_id.to_string()))
    }
}
