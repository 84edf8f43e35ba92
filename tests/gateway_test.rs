//! End-to-end: DasClient -> gateway (real router on a local port) -> mocked Helius.

use std::time::Duration;

use cnft_das_gateway::config::ClientConfig;
use cnft_das_gateway::credentials::CredentialSources;
use cnft_das_gateway::das::{DasClient, DasError};
use cnft_das_gateway::http;
use cnft_das_gateway::state::AppState;
use cnft_das_gateway::status::{GatewayStatus, HealthWatch};
use cnft_das_gateway::upstream::UpstreamClient;
use serde_json::json;
use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{body_partial_json, method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "abc123";

async fn spawn_gateway(sources: CredentialSources, upstream: &str) -> Url {
    let upstream =
        UpstreamClient::new(Url::parse(upstream).unwrap(), Duration::from_secs(5)).unwrap();
    let router = http::router(AppState::new(sources, upstream));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service()).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

fn client(gateway: Url) -> DasClient {
    DasClient::new(&ClientConfig::new(gateway, Some(SECRET.into()))).unwrap()
}

#[tokio::test]
async fn owner_assets_flow_through_gateway() {
    let helius = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("api-key", SECRET))
        .and(body_partial_json(json!({"method": "getAssetsByOwner", "id": "helius-das-api"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "helius-das-api",
            "result": {
                "total": 1,
                "limit": 1000,
                "page": 1,
                "items": [{
                    "id": "Compressed1",
                    "content": {
                        "$schema": "",
                        "json_uri": "",
                        "files": [{"uri": "https://arweave.net/1.png"}],
                        "metadata": {"name": "Plot #1", "symbol": "PLOT"}
                    },
                    "compression": {
                        "eligible": false,
                        "compressed": true,
                        "data_hash": "dh",
                        "creator_hash": "ch",
                        "asset_hash": "ah",
                        "tree": "Tree1111",
                        "seq": 1,
                        "leaf_id": 4
                    },
                    "ownership": {
                        "frozen": false,
                        "delegated": false,
                        "delegate": null,
                        "ownership_model": "single",
                        "owner": "Owner111"
                    },
                    "mutable": true,
                    "burnt": false
                }]
            }
        })))
        .expect(1)
        .mount(&helius)
        .await;

    let gateway = spawn_gateway(
        CredentialSources::from_values(Some(SECRET), None),
        &helius.uri(),
    )
    .await;

    let nfts = client(gateway).get_assets_by_owner("Owner111").await.unwrap();
    assert_eq!(nfts.len(), 1);
    assert_eq!(nfts[0].image, "https://arweave.net/1.png");
    assert_eq!(nfts[0].tree, "Tree1111");
    assert_eq!(nfts[0].leaf_id, 4);
}

#[tokio::test]
async fn upstream_rpc_error_reaches_client_as_api_error() {
    let helius = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "helius-das-api",
            "error": {"code": -32602, "message": "Invalid asset id"}
        })))
        .mount(&helius)
        .await;

    let gateway = spawn_gateway(
        CredentialSources::from_values(Some(SECRET), None),
        &helius.uri(),
    )
    .await;

    let err = client(gateway).get_asset_proof("bogus").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid asset id");
}

#[tokio::test]
async fn unconfigured_gateway_fails_without_leaking_anything() {
    let gateway = spawn_gateway(CredentialSources::default(), "http://127.0.0.1:1/").await;

    let err = client(gateway).get_asset("Asset1").await.unwrap_err();
    match err {
        DasError::Transport { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("Helius API key not configured on server"));
        }
        other => panic!("expected Transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_upstream_error_omits_key() {
    let gateway = spawn_gateway(
        CredentialSources::from_values(Some("hidden-key-value"), None),
        "http://127.0.0.1:1/",
    )
    .await;

    let err = client(gateway).get_asset("Asset1").await.unwrap_err();
    match err {
        DasError::Transport { status, body } => {
            assert_eq!(status, 500);
            assert!(!body.contains("hidden-key-value"));
        }
        other => panic!("expected Transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn health_reflects_server_credential() {
    let cases = [
        (Some(""), false),
        (Some("YOUR_HELIUS_API_KEY_HERE"), false),
        (Some(SECRET), true),
    ];
    for (server_key, expected) in cases {
        let gateway = spawn_gateway(
            CredentialSources::from_values(server_key, None),
            "http://127.0.0.1:1/",
        )
        .await;
        let report = client(gateway).gateway_health().await;
        assert_eq!(report.ok, expected, "server key {server_key:?}");
    }
}

#[tokio::test]
async fn health_watch_reports_missing_key_when_gateway_is_down() {
    let gateway = Url::parse("http://127.0.0.1:1/").unwrap();
    let mut watch = HealthWatch::mount(client(gateway));
    assert_eq!(watch.resolved().await, GatewayStatus::MissingKey);
    assert!(watch.status().shows_warning());
}

#[tokio::test]
async fn health_watch_clears_warning_for_configured_gateway() {
    let gateway = spawn_gateway(
        CredentialSources::from_values(Some(SECRET), None),
        "http://127.0.0.1:1/",
    )
    .await;
    let mut watch = HealthWatch::mount(client(gateway));
    assert_eq!(watch.resolved().await, GatewayStatus::Ready);
}
