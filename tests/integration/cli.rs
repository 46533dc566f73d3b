//! Tests for the `stackhub` binary over filesystem replicas.

use assert_cmd::Command;
use predicates::prelude::*;
use stackhub_cli::test_utils::sample_parameters_yaml;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[storage]\ngzip = true\n").unwrap();
        Self {
            dir,
        }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    fn write(&self, name: &str, content: &str) -> String {
        let path = self.path(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn stackhub(&self) -> Command {
        let mut cmd = Command::cargo_bin("stackhub").unwrap();
        cmd.arg("--config")
            .arg(self.path("config.toml"))
            .env_remove("STACKHUB_ENCRYPTION_KEY")
            .env_remove("RUST_LOG")
            .current_dir(self.dir.path());
        cmd
    }
}

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("stackhub").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("outputs"));
}

#[test]
fn test_put_check_get_round_trip() {
    let ws = Workspace::new();
    let input = ws.write("input.json", "{\"ok\":true}");
    let a = ws.path("a/hub.state");
    let b = ws.path("b/hub.state");

    ws.stackhub()
        .args(["put", "--input", &input, &a, &b])
        .assert()
        .success()
        .stderr(predicate::str::contains("2 replica(s)"));

    ws.stackhub()
        .args(["check", "--format", "json", &a, &b])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"exists\": true"))
        .stdout(predicate::str::contains("\"chosen\""));

    ws.stackhub().args(["get", &b]).assert().success().stdout("{\"ok\":true}");
}

#[test]
fn test_get_missing_file_fails() {
    let ws = Workspace::new();
    ws.stackhub()
        .args(["get", &ws.path("absent.state")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No state file found"));
}

#[test]
fn test_locks_detects_sentinel() {
    let ws = Workspace::new();
    let state = ws.write("hub.state", "x");
    ws.write("hub.state.lock", "");

    ws.stackhub()
        .args(["locks", &state])
        .assert()
        .failure()
        .stderr(predicate::str::contains("locked"));

    ws.stackhub().args(["--force", "locks", &state]).assert().success();
}

#[test]
fn test_lock_then_outputs() {
    let ws = Workspace::new();
    let params = ws.write("parameters.yaml", sample_parameters_yaml());
    let outputs = ws.write(
        "outputs.yaml",
        "outputs:\n  - name: host\n    value: https://${ingress.host}:${ingress.port}\n    brief: Public endpoint\n",
    );
    let state = ws.path("hub.state");

    ws.stackhub()
        .env("HUB_TEST_DB_PASSWORD", "s3cret")
        .args(["lock", &params, "--state", &state, "--no-input"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ingress.host\""))
        .stdout(predicate::str::contains("app.example.com"));

    ws.stackhub()
        .args(["outputs", &outputs, "--state", &state, "--save"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://app.example.com:443"))
        .stdout(predicate::str::contains("Public endpoint"));
}

#[test]
fn test_lock_without_user_value_fails() {
    let ws = Workspace::new();
    let params = ws.write("parameters.yaml", sample_parameters_yaml());

    ws.stackhub()
        .env_remove("HUB_TEST_DB_PASSWORD")
        .args(["lock", &params, "--no-input"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("password"));
}
