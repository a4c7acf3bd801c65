mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use autoshorts::shorts::server;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use common::{Harness, HarnessOptions, PNG, TestEnvironment, harness};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

const BODY_LIMIT: usize = 4 * 1024 * 1024;

/// Serve the router on an ephemeral port. The environment is returned so the
/// workspace root outlives the requests.
async fn spawn_server(options: HarnessOptions) -> Result<(SocketAddr, TestEnvironment)> {
    let Harness { env, pipeline, .. } = harness(options)?;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = server::router(Arc::new(pipeline), BODY_LIMIT);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, env))
}

fn client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().no_proxy().build()
}

fn script_form() -> Form {
    Form::new()
        .text("title", "서버 테스트")
        .text("script", "서버에서 만든 짧은 대본입니다.")
        .part(
            "images",
            Part::bytes(PNG.to_vec()).file_name("cover.png").mime_str("image/png").unwrap(),
        )
}

#[tokio::test]
async fn health_check_answers_ok() -> Result<()> {
    let (addr, _env) = spawn_server(HarnessOptions::default()).await?;
    let body = client()?
        .get(format!("http://{addr}/healthz"))
        .send()
        .await?
        .text()
        .await?;
    assert_eq!(body, "ok");
    Ok(())
}

#[tokio::test]
async fn create_returns_the_video_as_an_attachment() -> Result<()> {
    let (addr, env) = spawn_server(HarnessOptions::default()).await?;

    let response = client()?
        .post(format!("http://{addr}/api/create"))
        .multipart(script_form())
        .send()
        .await?;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "video/mp4");
    assert_eq!(
        response.headers()["content-disposition"].as_bytes(),
        "attachment; filename=\"서버 테스트.mp4\"".as_bytes()
    );
    let video = response.bytes().await?;
    assert!(video.starts_with(b"\0\0\0\x18ftyp"));
    assert_eq!(env.leftover_workspaces(), 0);
    Ok(())
}

#[tokio::test]
async fn create_can_answer_with_a_json_envelope() -> Result<()> {
    let (addr, _env) = spawn_server(HarnessOptions::default()).await?;

    let response = client()?
        .post(format!("http://{addr}/api/create"))
        .multipart(script_form().text("response", "json"))
        .send()
        .await?;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["title"], "서버 테스트");
    assert_eq!(body["data"]["script"], "서버에서 만든 짧은 대본입니다.");
    assert!(body["data"]["captions"].as_str().unwrap().contains("-->"));
    let video = STANDARD.decode(body["data"]["videoBase64"].as_str().unwrap())?;
    assert!(video.starts_with(b"\0\0\0\x18ftyp"));
    Ok(())
}

#[tokio::test]
async fn missing_source_is_rejected_with_an_envelope() -> Result<()> {
    let (addr, _env) = spawn_server(HarnessOptions::default()).await?;

    let response = client()?
        .post(format!("http://{addr}/api/create"))
        .multipart(Form::new().text("title", "제목만"))
        .send()
        .await?;

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "An article URL or a script is required.");
    assert!(body.get("data").is_none());
    Ok(())
}

#[tokio::test]
async fn render_failure_hides_engine_diagnostics() -> Result<()> {
    let (addr, env) = spawn_server(HarnessOptions {
        engine_fails: true,
        ..HarnessOptions::default()
    })
    .await?;

    let response = client()?
        .post(format!("http://{addr}/api/create"))
        .multipart(script_form())
        .send()
        .await?;

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "Video rendering failed.");
    assert!(!body.to_string().contains("Invalid data"));
    assert_eq!(env.leftover_workspaces(), 0);
    Ok(())
}
