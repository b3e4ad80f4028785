//! HTTP query surface tests

#![cfg(feature = "http")]

use cortex_core::Message;
use cortex_test_utils::TestBridge;
use serde_json::{json, Value};

async fn get_json(url: &str) -> (reqwest::StatusCode, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

async fn announce(bridge: &TestBridge) {
    bridge
        .emit(
            &Message::new("/brahma/registry/module")
                .arg("lorenz")
                .arg("daemon")
                .arg("DaemonSynth")
                .arg(3)
                .arg(0)
                .arg("chaos source"),
        )
        .await;
    bridge
        .emit(
            &Message::new("/brahma/registry/param")
                .arg("lorenz")
                .arg("rate")
                .arg(0.5f32)
                .arg(0.0f32)
                .arg(2.0f32)
                .arg("Hz")
                .arg("rate of change"),
        )
        .await;
    bridge
        .emit(&Message::new("/brahma/registry/module").arg("arbor").arg("tree"))
        .await;
    assert!(bridge.wait_for_modules(2).await);
}

#[tokio::test]
async fn test_list_modules() {
    let bridge = TestBridge::start().await;
    announce(&bridge).await;

    let (status, body) = get_json(&format!("{}/api/modules", bridge.http_url())).await;

    assert!(status.is_success());
    assert_eq!(
        body,
        json!([
            {
                "name": "arbor",
                "category": "tree",
                "synthDef": "",
                "numParams": 0,
                "numInstances": 0,
                "description": ""
            },
            {
                "name": "lorenz",
                "category": "daemon",
                "synthDef": "DaemonSynth",
                "numParams": 3,
                "numInstances": 0,
                "description": "chaos source"
            }
        ])
    );
}

#[tokio::test]
async fn test_module_params() {
    let bridge = TestBridge::start().await;
    announce(&bridge).await;

    // Datagrams are handled in order, so the param is cached once both modules are
    let (status, body) =
        get_json(&format!("{}/api/modules/lorenz/params", bridge.http_url())).await;

    assert!(status.is_success());
    assert_eq!(
        body,
        json!([{
            "name": "rate",
            "default": 0.5,
            "min": 0.0,
            "max": 2.0,
            "units": "Hz",
            "desc": "rate of change"
        }])
    );
}

#[tokio::test]
async fn test_unknown_module_params_empty() {
    let bridge = TestBridge::start().await;

    let (status, body) =
        get_json(&format!("{}/api/modules/nothing/params", bridge.http_url())).await;

    assert!(status.is_success());
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_health_counts() {
    let bridge = TestBridge::start().await;
    let _client = bridge.connect_client().await;
    announce(&bridge).await;

    let (status, body) = get_json(&format!("{}/api/health", bridge.http_url())).await;

    assert!(status.is_success());
    assert_eq!(body, json!({"status": "ok", "modules": 2, "clients": 1}));
}

#[tokio::test]
async fn test_cors_header() {
    let bridge = TestBridge::start().await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/modules", bridge.http_url()))
        .header("Origin", "http://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap()),
        Some("*")
    );
}

#[tokio::test]
async fn test_static_files() {
    let dir = std::env::temp_dir().join(format!("cortex-static-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), "<h1>cortex</h1>").unwrap();

    let static_dir = dir.clone();
    let bridge = TestBridge::start_with(move |c| c.static_dir = Some(static_dir)).await;

    let response = reqwest::get(format!("{}/index.html", bridge.http_url()))
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "<h1>cortex</h1>");

    // API routes take precedence over the static fallback
    let (status, _) = get_json(&format!("{}/api/modules", bridge.http_url())).await;
    assert!(status.is_success());

    let _ = std::fs::remove_dir_all(&dir);
}
