//! Image resolution against a fake simplestreams index.

mod common;

use cirrus_lxd::{LxdError, Stream, Variant, VM_HASH_KEY, XENIAL_VSOCK_IMAGE};
use common::lxd;

#[tokio::test]
async fn test_daily_container_image_is_newest() {
    let (lxd, _, index) = lxd(Variant::Container);

    let image = lxd.daily_image("focal", None).await.unwrap();
    assert_eq!(image, "ubuntu-daily:focal-squashfs");

    let queries = index.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].stream, Stream::Daily);
    assert_eq!(
        queries[0].filters,
        vec![
            "datatype=image-downloads",
            "ftype=lxd.tar.xz",
            "arch=amd64",
            "release=focal",
        ]
    );
}

#[tokio::test]
async fn test_released_vm_image() {
    let (lxd, _, index) = lxd(Variant::VirtualMachine);

    let image = lxd.released_image("focal", None).await.unwrap();
    assert_eq!(image, "ubuntu:focal-rel-disk");
    assert_eq!(index.queries()[0].stream, Stream::Released);
}

#[tokio::test]
async fn test_version_number_resolves_to_codename() {
    let (lxd, _, _) = lxd(Variant::Container);
    let image = lxd.daily_image("20.04", None).await.unwrap();
    assert_eq!(image, "ubuntu-daily:focal-squashfs");
}

#[tokio::test]
async fn test_trusty_container_uses_rootxz() {
    let (lxd, _, _) = lxd(Variant::Container);
    let image = lxd.daily_image("trusty", None).await.unwrap();
    assert_eq!(image, "ubuntu-daily:trusty-rootxz");
}

#[tokio::test]
async fn test_xenial_vm_is_pinned() {
    let (lxd, _, index) = lxd(Variant::VirtualMachine);

    let image = lxd.daily_image("xenial", None).await.unwrap();
    assert_eq!(image, XENIAL_VSOCK_IMAGE);
    assert!(index.queries().is_empty());
}

#[tokio::test]
async fn test_trusty_vm_is_unsupported() {
    let (lxd, _, index) = lxd(Variant::VirtualMachine);

    let err = lxd.released_image("trusty", None).await.unwrap_err();
    assert_eq!(err.to_string(), "Release trusty is not supported for LXD vms");
    assert!(index.queries().is_empty());
}

#[tokio::test]
async fn test_missing_hash_key() {
    let (lxd, _, _) = lxd(Variant::VirtualMachine);

    let err = lxd.daily_image("jammy", None).await.unwrap_err();
    assert!(matches!(err, LxdError::MissingHashKey { ref key, .. } if key == VM_HASH_KEY));
}

#[tokio::test]
async fn test_no_image_found() {
    let (lxd, _, _) = lxd(Variant::Container);

    let err = lxd.daily_image("warty", None).await.unwrap_err();
    assert!(matches!(err, LxdError::NoImageFound(_)));

    let err = lxd.daily_image("focal", Some("arm64")).await.unwrap_err();
    assert!(matches!(err, LxdError::NoImageFound(_)));
}

#[tokio::test]
async fn test_image_info_unknown_remote() {
    let (lxd, _, index) = lxd(Variant::Container);

    let err = lxd.image_info("images:abc123", None).await.unwrap_err();
    assert!(matches!(err, LxdError::UnknownRemote(ref remote) if remote == "images"));
    assert!(index.queries().is_empty());
}

#[tokio::test]
async fn test_image_info_stream_from_remote() {
    let (lxd, _, index) = lxd(Variant::Container);

    lxd.image_info("ubuntu:focal-rel-squashfs", None).await.unwrap();
    lxd.image_info("ubuntu-daily:focal-squashfs", None).await.unwrap();
    lxd.image_info("focal-squashfs", None).await.unwrap();

    let streams: Vec<Stream> = index.queries().iter().map(|q| q.stream).collect();
    assert_eq!(streams, vec![Stream::Released, Stream::Daily, Stream::Daily]);
}

#[tokio::test]
async fn test_image_info_explicit_key() {
    let (lxd, _, index) = lxd(Variant::Container);

    let records = lxd
        .image_info("xenial-disk", Some(VM_HASH_KEY))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        index.queries()[0].filters,
        vec!["combined_disk1-img_sha256=xenial-disk"]
    );
}

#[tokio::test]
async fn test_container_serial_falls_back_to_rootxz() {
    let (lxd, _, index) = lxd(Variant::Container);

    let serial = lxd.image_serial("ubuntu-daily:trusty-rootxz").await.unwrap();
    assert_eq!(serial.as_deref(), Some("20191107"));

    let filters: Vec<String> = index
        .queries()
        .into_iter()
        .flat_map(|q| q.filters)
        .collect();
    assert_eq!(
        filters,
        vec![
            "combined_squashfs_sha256=trusty-rootxz",
            "combined_rootxz_sha256=trusty-rootxz",
        ]
    );
}

#[tokio::test]
async fn test_container_serial_single_query_when_found() {
    let (lxd, _, index) = lxd(Variant::Container);

    let serial = lxd.image_serial("ubuntu:focal-rel-squashfs").await.unwrap();
    assert_eq!(serial.as_deref(), Some("20240215"));
    assert_eq!(index.queries().len(), 1);
}

#[tokio::test]
async fn test_vm_serial() {
    let (lxd, _, index) = lxd(Variant::VirtualMachine);

    assert_eq!(lxd.image_serial(XENIAL_VSOCK_IMAGE).await.unwrap(), None);
    assert!(index.queries().is_empty());

    let serial = lxd.image_serial("focal-disk-old").await.unwrap();
    assert_eq!(serial.as_deref(), Some("20240101"));
}

#[tokio::test]
async fn test_serial_of_unknown_fingerprint() {
    let (lxd, _, _) = lxd(Variant::Container);

    let err = lxd.image_serial("deadbeef").await.unwrap_err();
    assert!(matches!(err, LxdError::NoImageFound(ref id) if id == "deadbeef"));
}

#[tokio::test]
async fn test_extract_release() {
    let (lxd, _, index) = lxd(Variant::VirtualMachine);

    assert_eq!(lxd.extract_release("ubuntu-daily:jammy").await.unwrap(), "jammy");
    assert_eq!(lxd.extract_release("22.04").await.unwrap(), "jammy");
    assert_eq!(lxd.extract_release(XENIAL_VSOCK_IMAGE).await.unwrap(), "xenial");
    assert_eq!(lxd.extract_release("ubuntu:22.04/amd64").await.unwrap(), "jammy");
    assert_eq!(
        lxd.extract_release("ubuntu-daily:focal-disk").await.unwrap(),
        "focal"
    );
    assert!(index.queries().is_empty());

    // A fingerprint alone needs the index.
    assert_eq!(lxd.extract_release("focal-disk").await.unwrap(), "focal");
    assert_eq!(index.queries().len(), 1);
}
