//! End-to-end tests of the podunit binary

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const POD_DESCRIPTION: &str = r#"
name = "web"
id = "123abc"
infra = "123abc-infra"
pid_file = "/run/containers/storage/overlay-containers/123abc-infra/userdata/conmon.pid"
version = "4.4.0"
run_root = "/run/containers/storage"
containers = ["db"]
create_command = ["podman", "pod", "create", "--name", "web"]
"#;

fn podunit(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_podunit"))
        .args(args)
        .env("PODUNIT_CONFIG", dir.join("missing.toml"))
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn write_pod(dir: &TempDir) -> String {
    let path = dir.path().join("pod.toml");
    std::fs::write(&path, POD_DESCRIPTION).unwrap();
    path.display().to_string()
}

#[test]
fn test_generate_existing_pod() {
    let dir = TempDir::new().unwrap();
    let pod = write_pod(&dir);

    let output = podunit(dir.path(), &["generate", "--name", &pod]);
    assert!(output.status.success());

    let unit = stdout(&output);
    assert!(unit.starts_with("# pod-web.service\n# autogenerated by Podman 4.4.0\n"));
    assert!(unit.contains("Requires=container-db.service\nBefore=container-db.service\n"));
    assert!(unit.contains("ExecStart=/usr/bin/podman start 123abc-infra\n"));
    assert!(unit.contains("TimeoutStopSec=70\n"));
}

#[test]
fn test_generate_new_pod_with_overrides() {
    let dir = TempDir::new().unwrap();
    let pod = write_pod(&dir);

    let output = podunit(
        dir.path(),
        &[
            "generate",
            "--new",
            "--no-header",
            "--restart-policy",
            "always",
            "--wants",
            "local-fs.target",
            &pod,
        ],
    );
    assert!(output.status.success());

    let unit = stdout(&output);
    assert!(unit.starts_with("# pod-123abc.service\n\n[Unit]\n"));
    assert!(unit.contains("# User-defined dependencies\nWants=local-fs.target\n"));
    assert!(unit.contains("Restart=always\n"));
    assert!(unit.contains(
        "ExecStartPre=/usr/bin/podman pod create --infra-conmon-pidfile %t/pod-123abc.pid \
         --pod-id-file %t/pod-123abc.pod-id --exit-policy=stop --name web --replace\n"
    ));
}

#[test]
fn test_generate_writes_files() {
    let dir = TempDir::new().unwrap();
    let pod = write_pod(&dir);
    let out = dir.path().display().to_string();

    let output = podunit(
        dir.path(),
        &["generate", "--files", "--output-dir", &out, "--name", &pod],
    );
    assert!(output.status.success());

    let path = dir.path().join("pod-web.service");
    assert_eq!(stdout(&output).trim(), path.display().to_string());
    assert!(std::fs::read_to_string(path)
        .unwrap()
        .contains("PIDFile=/run/containers/storage/overlay-containers/123abc-infra/userdata/conmon.pid\n"));
}

#[test]
fn test_generate_invalid_restart_policy() {
    let dir = TempDir::new().unwrap();
    let pod = write_pod(&dir);

    let output = podunit(
        dir.path(),
        &["generate", "--restart-policy", "sometimes", &pod],
    );
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_rewrite_new() {
    let dir = TempDir::new().unwrap();

    let output = podunit(
        dir.path(),
        &[
            "rewrite",
            "--new",
            "--service-name",
            "pod-web",
            "--",
            "podman",
            "pod",
            "create",
            "--name",
            "web",
            "--exit-policy=continue",
        ],
    );
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "/usr/bin/podman pod create --infra-conmon-pidfile %t/pod-web.pid \
         --pod-id-file %t/pod-web.pod-id --name web --exit-policy=continue --replace\n"
    );
}

#[test]
fn test_rewrite_rejects_non_pod_create() {
    let dir = TempDir::new().unwrap();

    let output = podunit(dir.path(), &["rewrite", "--", "podman", "run", "alpine"]);
    assert!(!output.status.success());
}

#[test]
fn test_policies() {
    let dir = TempDir::new().unwrap();

    let output = podunit(dir.path(), &["policies"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output).lines().collect::<Vec<_>>(),
        vec![
            "no",
            "on-success",
            "on-failure",
            "on-abnormal",
            "on-watchdog",
            "on-abort",
            "always"
        ]
    );
}
