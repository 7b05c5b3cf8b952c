use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        seed_claude_fixture(&home);

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_config,
            xdg_state,
        }
    }

    fn session_path(&self) -> PathBuf {
        self.home
            .join(".claude/projects/-Users-test-dev-myproject")
            .join("test-session-001.jsonl")
    }
}

fn seed_claude_fixture(home: &Path) {
    let source = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../ccproxy-core/tests/fixtures/claude-code/minimal-session.jsonl");
    let target = home
        .join(".claude/projects/-Users-test-dev-myproject")
        .join("test-session-001.jsonl");

    fs::create_dir_all(target.parent().expect("missing fixture parent"))
        .expect("failed to create claude fixture directories");
    fs::copy(source, target).expect("failed to copy claude fixture");
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("ccproxy"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute ccproxy: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    panic!(
        "ccproxy {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn sessions_lists_seeded_fixture() {
    let env = CliTestEnv::new();

    let args = ["sessions"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let body: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let sessions = body["sessions"].as_array().expect("sessions array");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["sessionId"], "test-session-001");
    assert_eq!(sessions[0]["projectPath"], "/Users/test/dev/myproject");
    assert_eq!(sessions[0]["messageCount"], 4);

    assert!(
        env.xdg_state.join("ccproxy").exists(),
        "log directory should be created under XDG_STATE_HOME"
    );
}

#[test]
fn send_appends_to_session_log() {
    let env = CliTestEnv::new();
    let before = fs::read_to_string(env.session_path()).expect("failed to read fixture");

    let args = [
        "send",
        "test-session-001",
        "Please add a README",
        "--project",
        "/Users/test/dev/myproject",
        "--no-notify",
    ];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let receipt: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(receipt["sessionId"], "test-session-001");

    let after = fs::read_to_string(env.session_path()).expect("failed to read session");
    assert!(after.starts_with(&before));

    let last: Value =
        serde_json::from_str(after.lines().last().expect("appended line")).expect("valid record");
    assert_eq!(last["uuid"], receipt["messageId"]);
    assert_eq!(last["parentUuid"], "msg-004");
    assert_eq!(last["userType"], "external");
    assert_eq!(last["message"]["content"], "Please add a README");
}

#[test]
fn send_to_unknown_session_fails() {
    let env = CliTestEnv::new();
    let before = fs::read_to_string(env.session_path()).expect("failed to read fixture");

    let output = run_bin(&env, &["send", "no-such-session", "hi", "--no-notify"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("session not found"),
        "expected not-found error, got:\n{stderr}"
    );
    assert_eq!(fs::read_to_string(env.session_path()).unwrap(), before);
}
