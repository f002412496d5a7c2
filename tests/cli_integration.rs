use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(home: &Path, api_base: &str, stream_output: bool) {
    let config = serde_json::json!({
        "default_model": "openai",
        "models": {
            "openai": {
                "api_key": "test-key",
                "model": "gpt-3.5-turbo",
                "api_base": api_base
            }
        },
        "proxy": {"enabled": false, "http": "", "https": ""},
        "max_history": 10,
        "stream_output": stream_output,
        "language": "auto"
    });
    fs::write(
        home.join(".ai.json"),
        serde_json::to_string_pretty(&config).expect("config should serialize"),
    )
    .expect("failed to write config file");
}

fn run_ask(home: &Path, args: &[&str], stdin_content: Option<&str>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ask"));
    cmd.args(args)
        .current_dir(home)
        .env("HOME", home)
        .env_remove("OPENAI_API_KEY")
        .env_remove("DEEPSEEK_API_KEY")
        .env_remove("QWEN_API_KEY")
        .env_remove("RUST_LOG")
        .env_remove("LOG_FORMAT")
        .env_remove("LOG_OUTPUT")
        .env_remove("LOG_FILE_PATH")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().expect("failed to spawn ask binary");
    if let Some(content) = stdin_content {
        child
            .stdin
            .as_mut()
            .expect("stdin should be piped")
            .write_all(content.as_bytes())
            .expect("failed to write stdin");
    }
    drop(child.stdin.take());
    child.wait_with_output().expect("failed to wait for ask binary")
}

#[tokio::test]
async fn once_with_piped_input_prints_the_reply_and_exits_zero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("Hello"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "World"}}]
        })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().expect("tempdir should be created");
    write_config(home.path(), &format!("{}/v1/", server.uri()), false);

    let output = run_ask(home.path(), &["--once"], Some("Hello"));
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(
        String::from_utf8_lossy(&output.stdout).contains("World"),
        "stdout: {}",
        String::from_utf8_lossy(&output.stdout)
    );
}

#[tokio::test]
async fn streamed_and_non_streamed_replies_match() {
    let server = MockServer::start().await;
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Wor\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"ld\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("\"stream\":true"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("\"stream\":false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "World"}}]
        })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().expect("tempdir should be created");
    write_config(home.path(), &format!("{}/v1/", server.uri()), true);

    let streamed = run_ask(home.path(), &["--once"], Some("Hello"));
    assert_eq!(streamed.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&streamed.stderr));
    let streamed_stdout = String::from_utf8_lossy(&streamed.stdout).into_owned();
    assert!(streamed_stdout.contains("World"), "stdout: {streamed_stdout}");

    let plain = run_ask(home.path(), &["--once", "--no-stream"], Some("Hello"));
    assert_eq!(plain.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&plain.stderr));
    assert!(
        String::from_utf8_lossy(&plain.stdout).contains("World"),
        "stdout: {}",
        String::from_utf8_lossy(&plain.stdout)
    );
}

#[tokio::test]
async fn once_auth_failure_exits_non_zero_and_mentions_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().expect("tempdir should be created");
    write_config(home.path(), &format!("{}/v1/", server.uri()), false);

    let output = run_ask(home.path(), &["--once"], Some("Hello"));
    assert_ne!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("authorization"), "stderr: {stderr}");
}

#[tokio::test]
async fn piped_input_is_fenced_ahead_of_positional_text() {
    let server = MockServer::start().await;
    // Newlines inside the fence arrive JSON-escaped in the request body.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("```\\nCONTEXT\\n```"))
        .and(body_string_contains("explain this"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "ok"}}]
        })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().expect("tempdir should be created");
    write_config(home.path(), &format!("{}/v1/", server.uri()), false);

    let output = run_ask(home.path(), &["--once", "explain", "this"], Some("CONTEXT"));
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn first_run_writes_the_template_then_fails_for_the_missing_key() {
    let home = tempfile::tempdir().expect("tempdir should be created");

    let output = run_ask(home.path(), &["--once"], Some("hi"));
    assert_ne!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("OPENAI_API_KEY"), "stderr: {stderr}");
    assert!(
        home.path().join(".ai.json").exists(),
        "expected the default config template to be created"
    );
}

#[test]
fn unknown_model_flag_fails_at_startup() {
    let home = tempfile::tempdir().expect("tempdir should be created");
    write_config(home.path(), "http://127.0.0.1:1/", false);

    let output = run_ask(home.path(), &["-m", "nope", "--once"], Some("hi"));
    assert_ne!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not defined"), "stderr: {stderr}");
}

#[test]
fn once_without_any_query_is_a_usage_error() {
    let home = tempfile::tempdir().expect("tempdir should be created");
    write_config(home.path(), "http://127.0.0.1:1/", false);

    let output = run_ask(home.path(), &["--once"], Some(""));
    assert_ne!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--once requires"), "stderr: {stderr}");
}

#[test]
fn version_flag_prints_the_version_and_exits_zero() {
    let home = tempfile::tempdir().expect("tempdir should be created");

    let output = run_ask(home.path(), &["-v"], None);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains(&format!("ask {}", env!("CARGO_PKG_VERSION"))),
        "stdout: {stdout}"
    );
}

#[test]
fn help_flag_prints_usage_and_the_config_path() {
    let home = tempfile::tempdir().expect("tempdir should be created");

    let output = run_ask(home.path(), &["-h"], None);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "stdout: {stdout}");
    assert!(stdout.contains(".ai.json"), "stdout: {stdout}");
}
