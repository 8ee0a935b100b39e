use std::process::Command;

#[test]
fn bundled_stage_runs_to_completion() {
    let output = Command::new(env!("CARGO_BIN_EXE_quiz-defence"))
        .args([
            "--level",
            "10",
            "--accuracy",
            "1.0",
            "--answer-every-ms",
            "300",
            "--ability",
            "w_slash",
        ])
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to invoke the quiz-defence binary");

    assert!(output.status.success(), "quiz-defence should exit cleanly");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("stage 1 cleared"), "unexpected output: {stdout}");
    assert!(stdout.contains("(first clear)"));
}

#[test]
fn unknown_stage_is_reported() {
    let output = Command::new(env!("CARGO_BIN_EXE_quiz-defence"))
        .args(["--stage", "42"])
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to invoke the quiz-defence binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("stage 42"), "unexpected error: {stderr}");
}
