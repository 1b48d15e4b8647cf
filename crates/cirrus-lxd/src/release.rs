//! Ubuntu release names, versions and architectures.

/// Known Ubuntu releases as `(codename, version)`.
pub const UBUNTU_RELEASES: &[(&str, &str)] = &[
    ("trusty", "14.04"),
    ("xenial", "16.04"),
    ("bionic", "18.04"),
    ("focal", "20.04"),
    ("groovy", "20.10"),
    ("hirsute", "21.04"),
    ("impish", "21.10"),
    ("jammy", "22.04"),
    ("kinetic", "22.10"),
    ("lunar", "23.04"),
    ("mantic", "23.10"),
    ("noble", "24.04"),
    ("oracular", "24.10"),
    ("plucky", "25.04"),
];

/// Resolve a codename or version number to its codename.
pub fn codename_of(release: &str) -> Option<&'static str> {
    UBUNTU_RELEASES
        .iter()
        .find(|(codename, version)| *codename == release || *version == release)
        .map(|(codename, _)| *codename)
}

/// Split `[<remote>:]<image>` into its parts.
pub fn split_remote(image_id: &str) -> (Option<&str>, &str) {
    match image_id.split_once(':') {
        Some((remote, image)) => (Some(remote), image),
        None => (None, image_id),
    }
}

/// Work out the release named by an image id without consulting an index.
///
/// A bare codename or version (after any remote prefix) resolves directly.
/// Otherwise the whole id, remote included, must mention `ubuntu` followed by
/// a codename or version, as in `ubuntu:22.04/amd64` or
/// `images:ubuntu/16.04/cloud`. Fingerprints resolve to `None`.
pub fn release_hint(image_id: &str) -> Option<&'static str> {
    let (_, image) = split_remote(image_id);
    if let Some(codename) = codename_of(image) {
        return Some(codename);
    }

    let start = image_id.find("ubuntu")? + "ubuntu".len();
    let rest = &image_id[start..];

    UBUNTU_RELEASES
        .iter()
        .filter_map(|(codename, version)| {
            [rest.find(codename), rest.find(version)]
                .into_iter()
                .flatten()
                .min()
                .map(|pos| (pos, *codename))
        })
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, codename)| codename)
}

/// Ubuntu architecture name for a Rust target architecture.
pub fn ubuntu_arch(target_arch: &'static str) -> &'static str {
    match target_arch {
        "x86_64" => "amd64",
        "x86" => "i386",
        "aarch64" => "arm64",
        "arm" => "armhf",
        "powerpc64" => "ppc64el",
        other => other,
    }
}

/// Ubuntu architecture name of the host.
pub fn local_arch() -> &'static str {
    ubuntu_arch(std::env::consts::ARCH)
}
