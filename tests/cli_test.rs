use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SNAPSHOT: &str = r#"{
    "now": 1700000000,
    "origins": [
        { "url": "https://a.example.com/", "local": { "theme": "\"dark\"", "raw": "not json" } },
        { "url": "https://ads.test/frame", "session": { "id": "42" } },
        { "url": "chrome://settings" }
    ],
    "cookies": [
        { "name": "sid", "value": "123456789", "domain": ".shop.test", "secure": true, "same_site": "lax" }
    ]
}"#;

/// Isolated home directory with a snapshot file in it
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("snapshot.json"), SNAPSHOT).unwrap();
        Self { dir }
    }

    fn snapshot(&self) -> String {
        self.dir.path().join("snapshot.json").display().to_string()
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("originscope").unwrap();
        cmd.env("HOME", self.dir.path())
            .env("ORIGINSCOPE_SETTINGS", self.dir.path().join("filter.toml"))
            .env_remove("RUST_LOG")
            .arg("--no-color");
        cmd
    }
}

// ─── Help & version ──────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    Sandbox::new()
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("filter"))
        .stdout(predicate::str::contains("clean"));
}

#[test]
fn test_version_flag() {
    Sandbox::new()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("originscope"));
}

// ─── Scan command ────────────────────────────────────────────────────────────

#[test]
fn test_scan_human_output() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["scan", &sandbox.snapshot()])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.example.com"))
        .stdout(predicate::str::contains("shop.test"))
        .stdout(predicate::str::contains("settings").not());
}

#[test]
fn test_scan_json_output() {
    let sandbox = Sandbox::new();
    let output = sandbox
        .cmd()
        .args(["scan", &sandbox.snapshot(), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["stats"]["domain_count"], 3);
    assert_eq!(json["domains"].as_array().unwrap().len(), 3);
    assert_eq!(json["stats"]["quality"]["local_json_failures"], 1);
    assert_eq!(json["stats"]["cookie_security"]["secure"], 1);
}

#[test]
fn test_scan_quiet_output() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["scan", &sandbox.snapshot(), "--format", "quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  3  "));
}

#[test]
fn test_scan_missing_snapshot_fails() {
    Sandbox::new()
        .cmd()
        .args(["scan", "/nonexistent/snapshot.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("snapshot"));
}

// ─── Filter command ──────────────────────────────────────────────────────────

#[test]
fn test_filter_blacklist_round_trip() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["filter", "set-mode", "blacklist"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["filter", "add", "blacklist", "*.ads.test"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added"));

    sandbox
        .cmd()
        .args(["filter", "check", "https://cdn.ads.test/x", "--format", "quiet"])
        .assert()
        .success()
        .stdout(predicate::str::diff("blocked\n"));
    sandbox
        .cmd()
        .args(["filter", "check", "https://news.test/", "--format", "quiet"])
        .assert()
        .success()
        .stdout(predicate::str::diff("allowed\n"));

    sandbox
        .cmd()
        .args(["filter", "remove", "blacklist", "*.ads.test"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["filter", "check", "ads.test", "--format", "quiet"])
        .assert()
        .success()
        .stdout(predicate::str::diff("allowed\n"));
}

#[test]
fn test_filter_show_json() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["filter", "show", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"mode\": \"disabled\""));
}

#[test]
fn test_filter_edit_refuses_unreadable_settings() {
    let sandbox = Sandbox::new();
    let original = "mode = \"whitelist\"\nwhitelist = [\"bank.test\", \"mail.test\"\n";
    std::fs::write(sandbox.path("filter.toml"), original).unwrap();

    for args in [
        vec!["filter", "add", "whitelist", "news.test"],
        vec!["filter", "remove", "whitelist", "bank.test"],
        vec!["filter", "set-mode", "disabled"],
    ] {
        sandbox
            .cmd()
            .args(&args)
            .assert()
            .failure()
            .stderr(predicate::str::contains("could not be read"));
    }

    assert_eq!(
        std::fs::read_to_string(sandbox.path("filter.toml")).unwrap(),
        original
    );
}

// ─── Config defaults ─────────────────────────────────────────────────────────

#[test]
fn test_output_format_from_config() {
    let sandbox = Sandbox::new();
    std::fs::create_dir_all(sandbox.path(".originscope")).unwrap();
    std::fs::write(
        sandbox.path(".originscope/config.toml"),
        "output_format = \"json\"\n",
    )
    .unwrap();

    let output = sandbox
        .cmd()
        .args(["scan", &sandbox.snapshot()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["stats"]["domain_count"], 3);

    // The flag still wins over the config
    sandbox
        .cmd()
        .args(["scan", &sandbox.snapshot(), "--format", "quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  3  "));
}

// ─── Clean command ───────────────────────────────────────────────────────────

#[test]
fn test_clean_dry_run_skips_protected_domains() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["filter", "set-mode", "blacklist"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["filter", "add", "blacklist", "shop.test"])
        .assert()
        .success();

    let output = sandbox
        .cmd()
        .args(["clean", &sandbox.snapshot(), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["mode"], "dry_run");
    assert_eq!(json["skipped"], serde_json::json!(["shop.test"]));
    assert_eq!(json["cleared"].as_array().unwrap().len(), 2);
}

// ─── Completions ─────────────────────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    Sandbox::new()
        .cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("originscope"));
}
