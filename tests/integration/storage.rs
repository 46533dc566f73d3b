use std::sync::Arc;

use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use stackhub_cli::core::{Diagnostics, HubError};
use stackhub_cli::storage::{
    BackendKind, Codec, StorageOptions, StorageSession, choose_file, ensure_no_lock_files,
};
use stackhub_cli::test_utils::StorageFixture;

fn locations(fixture: &StorageFixture) -> Vec<String> {
    vec![
        fixture.local("dev/hub.state"),
        "s3://states/dev/hub.state".to_string(),
        "gs://states/dev/hub.state".to_string(),
        "az://states/dev/hub.state".to_string(),
    ]
}

/// Writing fans out to every backend and any replica reads back the same data.
#[tokio::test]
async fn test_write_all_backends_then_read() {
    let fixture = StorageFixture::new();
    let session = fixture.session();
    let locations = locations(&fixture);
    let mut diags = Diagnostics::new();

    let file = session.check(&locations, "state", &mut diags).await.unwrap();
    assert_eq!(file.replicas.len(), 4);
    assert!(file.existing().next().is_none());
    assert!(matches!(session.read(&file).await, Err(HubError::NotFound { .. })));

    let report = session.write(b"{\"stack\":\"dev\"}", &file).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.written(), 4);

    let file = session.check(&locations, "state", &mut diags).await.unwrap();
    assert_eq!(file.existing().count(), 4);
    let sizes: Vec<u64> = file.replicas.iter().map(|r| r.size).collect();
    assert!(sizes.windows(2).all(|w| w[0] == w[1]), "one shared payload: {sizes:?}");

    let (bytes, from) = session.read(&file).await.unwrap();
    assert_eq!(bytes, b"{\"stack\":\"dev\"}");
    assert_eq!(from.kind, BackendKind::Fs, "equal sizes prefer the local replica");

    let raw = fixture.s3.get(&ObjectPath::from("dev/hub.state")).await.unwrap().bytes().await.unwrap();
    assert!(!raw.windows(4).any(|w| w == b"dev\""), "remote payload is encrypted");
    assert!(!diags.has_errors());
}

/// A newer remote replica wins over a stale local copy.
#[tokio::test]
async fn test_stale_local_replica_is_not_chosen() {
    let fixture = StorageFixture::new();
    let plain = StorageOptions {
        gzip: false,
        encrypt_remote: false,
        ..StorageOptions::default()
    };
    let session = fixture.session_with(plain);
    let mut diags = Diagnostics::new();

    std::fs::create_dir_all(fixture.local_path("dev")).unwrap();
    std::fs::write(fixture.local_path("dev/hub.state"), b"old").unwrap();
    let old = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
    std::fs::File::options()
        .write(true)
        .open(fixture.local_path("dev/hub.state"))
        .unwrap()
        .set_modified(old)
        .unwrap();
    fixture.gcs.put(&ObjectPath::from("dev/hub.state"), b"fresh".to_vec().into()).await.unwrap();

    let locations = vec![fixture.local("dev/hub.state"), "gs://states/dev/hub.state".to_string()];
    let file = session.check(&locations, "state", &mut diags).await.unwrap();
    let chosen = choose_file(&file).unwrap();
    assert_eq!(chosen.location.kind, BackendKind::Gcs);

    let (bytes, _) = session.read(&file).await.unwrap();
    assert_eq!(bytes, b"fresh");
}

/// Lock sentinels block writes and the lock check unless forced.
#[tokio::test]
async fn test_locked_replica_refused_unless_forced() {
    let fixture = StorageFixture::new();
    let locations = locations(&fixture);
    fixture.s3.put(&ObjectPath::from("dev/hub.state.lock"), Vec::<u8>::new().into()).await.unwrap();
    let mut diags = Diagnostics::new();

    let session = fixture.session();
    let file = session.check(&locations, "state", &mut diags).await.unwrap();
    assert_eq!(file.locked().count(), 1);
    assert!(matches!(
        ensure_no_lock_files(std::slice::from_ref(&file), false, &mut diags),
        Err(HubError::Locked { .. })
    ));

    let report = session.write(b"data", &file).await.unwrap();
    assert_eq!(report.written(), 3);
    assert!(report.into_result(&mut diags).is_err());

    let forced = fixture.session_with(StorageOptions {
        force: true,
        ..StorageOptions::default()
    });
    let report = forced.write(b"data", &file).await.unwrap();
    assert_eq!(report.written(), 4);
    assert!(ensure_no_lock_files(std::slice::from_ref(&file), true, &mut diags).is_ok());
}

/// Unusable locations are skipped with a diagnostic, the rest still work.
#[tokio::test]
async fn test_bad_locations_are_reported_and_skipped() {
    let fixture = StorageFixture::new();
    let session = fixture.session();
    let mut diags = Diagnostics::new();

    let locations = vec![
        "ftp://states/hub.state".to_string(),
        "s3://".to_string(),
        "s3://states/hub.state".to_string(),
    ];
    let file = session.check(&locations, "state", &mut diags).await.unwrap();
    assert_eq!(file.replicas.len(), 1);
    assert_eq!(diags.errors().len(), 2);

    let mut diags = Diagnostics::new();
    let err = session
        .check(&["ftp://x/y".to_string()], "state", &mut diags)
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::NoReplicas { .. }));
}

/// Encrypted remote data cannot be read without the key.
#[tokio::test]
async fn test_reading_encrypted_replica_without_key_fails() {
    let fixture = StorageFixture::new();
    let locations = vec!["az://states/dev/hub.state".to_string()];
    let mut diags = Diagnostics::new();

    let session = fixture.session();
    let file = session.check(&locations, "state", &mut diags).await.unwrap();
    session.write(b"secret", &file).await.unwrap().into_result(&mut diags).unwrap();

    let keyless = StorageSession::new(StorageOptions::default(), Codec::plain()).with_store(
        BackendKind::Azure,
        "states",
        Arc::clone(&fixture.azure) as Arc<dyn ObjectStore>,
    );
    let file = keyless.check(&locations, "state", &mut diags).await.unwrap();
    assert!(matches!(keyless.read(&file).await, Err(HubError::Codec { .. })));
}
