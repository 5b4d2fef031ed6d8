#![allow(clippy::unwrap_used)]
// Integration tests for `AuthSession` and `CloudClient` using wiremock.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use secrecy::SecretString;
use serde_json::json;
use tokio_test::assert_ok;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use petlibro_api::{
    AuthError, AuthSession, CloudClient, Credentials, MaintenanceKey, Region, TokenSource,
    TransportConfig, TransportError, WaterMode,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Arc<AuthSession>, CloudClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let http = TransportConfig::default().build_client().unwrap();
    let session = Arc::new(AuthSession::with_client(
        http,
        base_url,
        Region::Us,
        "America/New_York",
    ));
    let client = CloudClient::new(Arc::clone(&session));
    (server, session, client)
}

fn credentials() -> Credentials {
    Credentials::new("owner@example.com", SecretString::from("password"))
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "msg": null, "data": data }))
}

async fn mount_login(server: &MockServer, token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/member/auth/login"))
        .respond_with(ok(json!({ "token": token })))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_sends_digest_and_app_headers() {
    let (server, session, _client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/member/auth/login"))
        .and(header("source", "ANDROID"))
        .and(body_partial_json(json!({
            "appId": 1,
            "country": "US",
            "email": "owner@example.com",
            "password": "5f4dcc3b5aa765d61d8327deb882cf99",
            "timezone": "America/New_York",
        })))
        .respond_with(ok(json!({ "token": "tok-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let issued = session.login(credentials()).await.unwrap();
    assert_eq!(issued.token(), "tok-1");
    assert_eq!(issued.generation, 1);
    assert_eq!(session.login_count(), 1);
}

#[tokio::test]
async fn test_login_rejected_is_invalid_credentials() {
    let (server, session, _client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/member/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "code": 1001, "msg": "Incorrect password" })),
        )
        .mount(&server)
        .await;

    let result = session.login(credentials()).await;
    assert!(
        matches!(&result, Err(AuthError::InvalidCredentials { message }) if message == "Incorrect password"),
        "expected InvalidCredentials, got: {result:?}"
    );
    assert!(session.current().await.is_none());
}

#[tokio::test]
async fn test_login_server_error_is_network_unavailable() {
    let (server, session, _client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/member/auth/login"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = session.login(credentials()).await;
    assert!(
        matches!(result, Err(AuthError::NetworkUnavailable(_))),
        "expected NetworkUnavailable, got: {result:?}"
    );
}

#[tokio::test]
async fn test_concurrent_ensure_valid_logs_in_once() {
    let (server, session, _client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/member/auth/login"))
        .respond_with(ok(json!({ "token": "tok-1" })).set_delay(Duration::from_millis(50)))
        .expect(1)
        .mount(&server)
        .await;

    session.set_credentials(credentials()).await;
    let results = join_all((0..8).map(|_| session.ensure_valid())).await;

    for result in results {
        assert_eq!(assert_ok!(result).token(), "tok-1");
    }
    assert_eq!(session.login_count(), 1);
}

#[tokio::test]
async fn test_ensure_valid_without_credentials_is_revoked() {
    let (_server, session, _client) = setup().await;

    let result = session.ensure_valid().await;
    assert!(matches!(result, Err(AuthError::Revoked { .. })));
}

#[tokio::test]
async fn test_closed_session_rejects_renewal() {
    let (server, session, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;
    session.login(credentials()).await.unwrap();

    session.close();

    assert!(matches!(session.ensure_valid().await, Err(AuthError::Closed)));
    let result = client.list_devices().await;
    assert!(
        matches!(result, Err(TransportError::Auth(AuthError::Closed))),
        "expected Auth(Closed), got: {result:?}"
    );
}

#[tokio::test]
async fn test_logout_clears_credentials() {
    let (server, session, _client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/member/auth/logout"))
        .and(header("token", "tok-1"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    session.login(credentials()).await.unwrap();
    session.logout().await.unwrap();

    assert!(session.current().await.is_none());
    assert!(matches!(
        session.ensure_valid().await,
        Err(AuthError::Revoked { .. })
    ));
}

// ── Request retry ───────────────────────────────────────────────────

#[tokio::test]
async fn test_not_logged_in_code_triggers_one_relogin() {
    let (server, session, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;
    mount_login(&server, "tok-2", 1).await;

    Mock::given(method("POST"))
        .and(path("/device/device/list"))
        .and(header("token", "tok-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": 1009, "msg": "not yet logged in" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/device/device/list"))
        .and(header("token", "tok-2"))
        .respond_with(ok(json!([
            { "deviceSn": "AF1", "productIdentifier": "PLAF103", "online": true }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    session.login(credentials()).await.unwrap();
    let devices = client.list_devices().await.unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device_sn, "AF1");
    assert_eq!(session.login_count(), 2);
}

#[tokio::test]
async fn test_second_unauthorized_is_reported() {
    let (server, session, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;
    mount_login(&server, "tok-2", 1).await;

    Mock::given(method("POST"))
        .and(path("/device/device/list"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    session.login(credentials()).await.unwrap();
    let result = client.list_devices().await;

    assert!(
        matches!(result, Err(TransportError::Unauthorized { .. })),
        "expected Unauthorized, got: {result:?}"
    );
    assert_eq!(session.login_count(), 2);
}

#[tokio::test]
async fn test_rejected_relogin_is_revoked() {
    let (server, session, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/member/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": 1001, "msg": "password changed" })),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/device/device/realInfo"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    session.login(credentials()).await.unwrap();
    let result = client.device_real_info("AF1").await;

    assert!(
        matches!(result, Err(TransportError::Auth(AuthError::Revoked { .. }))),
        "expected Auth(Revoked), got: {result:?}"
    );
}

#[tokio::test]
async fn test_concurrent_requests_share_one_rejected_relogin() {
    let (server, session, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/member/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "code": 1001, "msg": "password changed" }))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/device/device/realInfo"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": 1009, "msg": "NOT_YET_LOGIN" })),
        )
        .mount(&server)
        .await;

    session.login(credentials()).await.unwrap();
    let results = join_all((0..8).map(|_| client.device_real_info("AF1"))).await;

    for result in &results {
        assert!(
            matches!(result, Err(TransportError::Auth(AuthError::Revoked { .. }))),
            "expected Auth(Revoked), got: {result:?}"
        );
    }
    let logins = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/member/auth/login")
        .count();
    assert_eq!(logins, 2, "one initial login plus one shared re-login");

    // Later cycles do not retry with the refused credentials either.
    let again = client.device_real_info("AF1").await;
    assert!(matches!(again, Err(TransportError::Auth(AuthError::Revoked { .. }))));
}

#[tokio::test]
async fn test_fresh_login_clears_rejected_relogin() {
    let (server, session, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/member/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": 1001, "msg": "password changed" })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_login(&server, "tok-2", 1).await;

    Mock::given(method("POST"))
        .and(path("/device/device/realInfo"))
        .and(header("token", "tok-1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/device/device/realInfo"))
        .and(header("token", "tok-2"))
        .respond_with(ok(json!({ "deviceSn": "AF1" })))
        .mount(&server)
        .await;

    session.login(credentials()).await.unwrap();
    assert!(client.device_real_info("AF1").await.is_err());

    let renewed = session.login(credentials()).await.unwrap();
    assert_eq!(renewed.token(), "tok-2");
    let data = client.device_real_info("AF1").await.unwrap();
    assert_eq!(data["deviceSn"], "AF1");
}

// ── Transport failures ──────────────────────────────────────────────

#[tokio::test]
async fn test_rate_limited_reads_retry_after() {
    let (server, session, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/device/device/realInfo"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "17"))
        .mount(&server)
        .await;

    session.login(credentials()).await.unwrap();
    let result = client.device_real_info("AF1").await;

    assert!(
        matches!(result, Err(TransportError::RateLimited { retry_after_secs: 17 })),
        "expected RateLimited(17), got: {result:?}"
    );
}

#[tokio::test]
async fn test_unreachable_host_is_not_retried() {
    let (server, session, _client) = setup().await;
    mount_login(&server, "tok-1", 1).await;
    session.login(credentials()).await.unwrap();

    // Port 9 (discard) is closed on test hosts.
    let source: Arc<dyn TokenSource> = session.clone();
    let dead = CloudClient::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:9").unwrap(),
        source,
    );
    let result = dead.list_devices().await;

    assert!(
        matches!(result, Err(TransportError::Unreachable(_))),
        "expected Unreachable, got: {result:?}"
    );
    assert_eq!(session.login_count(), 1);
}

#[tokio::test]
async fn test_api_error_code_is_surfaced() {
    let (server, session, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/device/device/manualFeeding"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": 2003, "msg": "device offline" })),
        )
        .mount(&server)
        .await;

    session.login(credentials()).await.unwrap();
    let err = client.manual_feed("AF1", 2).await.unwrap_err();

    assert_eq!(err.api_code(), Some(2003));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_non_json_body_is_deserialization_error() {
    let (server, session, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/member/member/info"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    session.login(credentials()).await.unwrap();
    let result = client.member_info().await;

    assert!(matches!(result, Err(TransportError::Deserialization { .. })));
}

// ── Control payloads ────────────────────────────────────────────────

#[tokio::test]
async fn test_control_payloads() {
    let (server, session, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("POST"))
        .and(path("/device/device/manualFeeding"))
        .and(header("token", "tok-1"))
        .and(body_partial_json(json!({ "deviceSn": "AF1", "grainNum": 3 })))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/device/setting/updateWaterDispensingMode"))
        .and(body_partial_json(json!({
            "deviceSn": "WF1",
            "useWaterType": 1,
            "useWaterInterval": 30,
            "useWaterDuration": 5,
        })))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/device/device/maintenanceFrequencySetting"))
        .and(body_partial_json(json!({
            "deviceSn": "WF1",
            "key": "FILTER_ELEMENT",
            "frequency": 30,
        })))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/device/device/machineCleaningReset"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    session.login(credentials()).await.unwrap();
    client.manual_feed("AF1", 3).await.unwrap();
    client
        .set_water_dispensing("WF1", WaterMode::Intermittent, 30, 5)
        .await
        .unwrap();
    client
        .set_maintenance_cycle("WF1", MaintenanceKey::FilterElement, 30)
        .await
        .unwrap();
    client
        .reset_maintenance("WF1", MaintenanceKey::MachineCleaning)
        .await
        .unwrap();
}
