use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::time::Duration;

fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("bf").unwrap();
    cmd.env("XDG_CONFIG_HOME", "/nonexistent/bf-runner-tests")
        .env_remove("BF_MAX_STEPS");
    cmd
}

fn infinite_bf() -> &'static str {
    "+[]" // increments to 1, then [] does nothing forever (infinite loop)
}

fn read_to_tempfile(content: &str) -> tempfile::NamedTempFile {
    let mut tf = tempfile::NamedTempFile::new().expect("tempfile");
    write!(tf, "{}", content).unwrap();
    tf
}

#[test]
fn test_timeout_cancels_infinite_loop() {
    let tf = read_to_tempfile(infinite_bf());
    cargo_bin()
        .arg("run").arg("--timeout").arg("100").arg("--file").arg(tf.path())
        .timeout(Duration::from_secs(5))
        .assert()
        .success()
        .stderr(predicate::str::contains("Execution cancelled"))
        .stdout(predicate::str::contains("Execution cancelled").not());
}

#[test]
fn test_cancelled_run_still_dumps_partial_tape() {
    cargo_bin()
        .args(["run", "--timeout", "100", "--dump", infinite_bf()])
        .timeout(Duration::from_secs(5))
        .assert()
        .success()
        .stderr(predicate::str::contains("000000: [1]"));
}

#[test]
fn test_step_limit_infinite_flag() {
    let tf = read_to_tempfile(infinite_bf());
    cargo_bin()
        .arg("run").arg("--max-steps").arg("50").arg("--file").arg(tf.path())
        .timeout(Duration::from_secs(5))
        .assert()
        .failure()
        .stderr(predicate::str::contains("step limit exceeded (50)"))
        .stdout(predicate::str::contains("Execution aborted").not());
}

#[test]
fn test_step_limit_from_env() {
    cargo_bin()
        .env("BF_MAX_STEPS", "50")
        .args(["run", infinite_bf()])
        .timeout(Duration::from_secs(5))
        .assert()
        .failure()
        .stderr(predicate::str::contains("step limit exceeded (50)"));
}

#[cfg(unix)]
#[test]
fn test_sigint_cancels_run_and_exits_0() {
    use assert_cmd::prelude::*;
    use std::process::{Command as StdCommand, Stdio};

    let mut child = StdCommand::cargo_bin("bf")
        .unwrap()
        .env("XDG_CONFIG_HOME", "/nonexistent/bf-runner-tests")
        .args(["run", infinite_bf()])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    std::thread::sleep(Duration::from_millis(500));
    let status = StdCommand::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "status: {:?}", output.status);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Execution cancelled"));
}
