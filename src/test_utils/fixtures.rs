//! Fixtures for storage and resolution tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use object_store::memory::InMemory;
use tempfile::TempDir;

use crate::parameters::{Parameter, ParameterKind};
use crate::storage::{BackendKind, Codec, EncryptionKey, StorageOptions, StorageSession};

/// Passphrase used by [`StorageFixture`] sessions.
pub const FIXTURE_SECRET: &str = "fixture passphrase";

/// A temporary directory and an in-memory bucket per remote backend.
///
/// Buckets are all named `states`: `s3://states/..`, `gs://states/..` and
/// `az://states/..` resolve to the fixture's stores.
pub struct StorageFixture {
    pub dir: TempDir,
    pub s3: Arc<InMemory>,
    pub gcs: Arc<InMemory>,
    pub azure: Arc<InMemory>,
}

impl StorageFixture {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
            s3: Arc::new(InMemory::new()),
            gcs: Arc::new(InMemory::new()),
            azure: Arc::new(InMemory::new()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Filesystem location of `name` inside the fixture directory.
    #[must_use]
    pub fn local(&self, name: &str) -> String {
        self.local_path(name).to_string_lossy().into_owned()
    }

    #[must_use]
    pub fn local_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Session with default options, gzip, and the fixture key.
    #[must_use]
    pub fn session(&self) -> StorageSession {
        self.session_with(StorageOptions::default())
    }

    #[must_use]
    pub fn session_with(&self, options: StorageOptions) -> StorageSession {
        let codec = Codec::new(options.gzip, Some(EncryptionKey::from_secret(FIXTURE_SECRET)));
        StorageSession::new(options, codec)
            .with_store(BackendKind::S3, "states", self.s3.clone())
            .with_store(BackendKind::Gcs, "states", self.gcs.clone())
            .with_store(BackendKind::Azure, "states", self.azure.clone())
    }
}

impl Default for StorageFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Stack parameters covering globals, component scoping, user input, links and
/// nested children.
#[must_use]
pub fn sample_parameters() -> Vec<Parameter> {
    let mut ingress = Parameter::new("ingress", "");
    ingress.children = vec![
        Parameter::new("host", "app.${dns.domain}"),
        Parameter::new("port", "443"),
    ];

    let mut password = Parameter::new("password", "").with_kind(ParameterKind::User);
    password.from_env = "HUB_TEST_DB_PASSWORD".to_string();

    vec![
        Parameter::new("dns.domain", "example.com"),
        Parameter::new("cloud.region", "us-east-1"),
        Parameter::new("size", "db.t3.medium").with_component("postgres"),
        password,
        Parameter::new("kubeconfig", "${kube:config}").with_kind(ParameterKind::Link),
        ingress,
    ]
}

/// The same parameters as [`sample_parameters`], as a parameters file.
pub const fn sample_parameters_yaml() -> &'static str {
    r#"parameters:
  - name: dns.domain
    value: example.com
  - name: cloud.region
    value: us-east-1
  - name: size
    component: postgres
    value: db.t3.medium
  - name: password
    kind: user
    fromEnv: HUB_TEST_DB_PASSWORD
  - name: kubeconfig
    kind: link
    value: ${kube:config}
  - name: ingress
    parameters:
      - name: host
        value: app.${dns.domain}
      - name: port
        value: "443"
"#
}
