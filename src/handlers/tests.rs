use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::configure_routes;
use crate::forwarder::Forwarder;
use crate::session::SessionManager;
use crate::settings::RelaySettings;
use crate::testing::{MockAuthenticator, TestFixtures};

macro_rules! relay_app {
    ($settings:expr, $authenticator:expr) => {{
        let settings: RelaySettings = $settings;
        let sessions = web::Data::new(SessionManager::new(
            $authenticator.clone(),
            settings.auth.clone(),
        ));
        let forwarder = web::Data::new(Forwarder::new(&settings.proxy).unwrap());
        test::init_service(
            App::new()
                .app_data(sessions)
                .app_data(forwarder)
                .configure(configure_routes),
        )
        .await
    }};
}

fn motor_base(server: &MockServer) -> String {
    format!("{}/m1", server.uri())
}

#[actix_web::test]
async fn test_health_before_login() {
    let authenticator = TestFixtures::authenticator();
    let app = relay_app!(TestFixtures::settings("http://127.0.0.1:1/m1"), authenticator);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({
            "status": "ok",
            "autoAuth": true,
            "session": "not authenticated",
            "expiresInMinutes": 0,
            "refreshInProgress": false
        })
    );
}

#[actix_web::test]
async fn test_health_after_proxied_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let authenticator = TestFixtures::authenticator();
    let app = relay_app!(TestFixtures::settings(&motor_base(&server)), authenticator);

    let req = test::TestRequest::get().uri("/api/motor-proxy/ping").to_request();
    test::call_service(&app, req).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["session"], "authenticated");
    assert_eq!(body["expiresInMinutes"], 25);
}

#[actix_web::test]
async fn test_health_reports_running_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let authenticator = Arc::new(
        MockAuthenticator::succeeding("ebsco-auth=XYZ").with_delay(Duration::from_millis(300)),
    );
    let app = relay_app!(TestFixtures::settings(&motor_base(&server)), authenticator);

    let proxied = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/motor-proxy/ping").to_request(),
    );
    let health = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        test::read_body_json::<Value, _>(resp).await
    };
    let (proxied, health) = tokio::join!(proxied, health);

    assert_eq!(proxied.status(), StatusCode::OK);
    assert_eq!(health["refreshInProgress"], true);
    assert_eq!(health["session"], "not authenticated");
}

#[actix_web::test]
async fn test_manual_auth_requires_both_fields() {
    let authenticator = TestFixtures::authenticator();
    let app = relay_app!(TestFixtures::settings("http://127.0.0.1:1/m1"), authenticator);

    for payload in [
        json!({"cardNumber": "1234"}),
        json!({"password": "secret"}),
        json!({"cardNumber": "", "password": "secret"}),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/auth/ebsco")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "cardNumber and password are required");
    }

    let req = test::TestRequest::post()
        .uri("/api/auth/ebsco")
        .set_payload("not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(authenticator.calls(), 0);
}

#[actix_web::test]
async fn test_manual_auth_returns_token_without_touching_session() {
    let authenticator = TestFixtures::authenticator();
    let app = relay_app!(TestFixtures::settings("http://127.0.0.1:1/m1"), authenticator);

    let req = test::TestRequest::post()
        .uri("/api/auth/ebsco")
        .set_json(json!({"cardNumber": "42", "password": "pw"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"authToken": "ebsco-auth=XYZ"}));
    assert_eq!(authenticator.calls(), 1);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["session"], "not authenticated");
}

#[actix_web::test]
async fn test_manual_auth_failures() {
    let no_token = Arc::new(MockAuthenticator::failing());
    let app = relay_app!(TestFixtures::settings("http://127.0.0.1:1/m1"), no_token);
    let req = test::TestRequest::post()
        .uri("/api/auth/ebsco")
        .set_json(json!({"cardNumber": "42", "password": "pw"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Authentication failed - no auth token received");

    let unreachable = Arc::new(MockAuthenticator::unreachable());
    let app = relay_app!(TestFixtures::settings("http://127.0.0.1:1/m1"), unreachable);
    let req = test::TestRequest::post()
        .uri("/api/auth/ebsco")
        .set_json(json!({"cardNumber": "42", "password": "pw"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Authentication failed");
    assert!(body["message"].is_string());
}

#[actix_web::test]
async fn test_proxy_without_session_never_calls_upstream() {
    let server = MockServer::start().await;
    let authenticator = TestFixtures::authenticator();
    let mut settings = TestFixtures::settings(&motor_base(&server));
    settings.auth.password.clear();
    let app = relay_app!(settings, authenticator);

    for uri in ["/api/motor-proxy/foo", "/api/ebsco-proxy/example.com/x"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Authentication failed");
    }

    assert_eq!(authenticator.calls(), 0);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_motor_proxy_forwards_with_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/m1/foo/bar"))
        .and(query_param("x", "1"))
        .and(header("cookie", "ebsco-auth=XYZ"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-upstream", "motor")
                .set_body_string("{\"ok\":true}"),
        )
        .expect(1)
        .mount(&server)
        .await;
    let authenticator = TestFixtures::authenticator();
    let app = relay_app!(TestFixtures::settings(&motor_base(&server)), authenticator);

    let req = test::TestRequest::get()
        .uri("/api/motor-proxy/foo/bar?x=1")
        .insert_header(("X-Auth-Token", "legacy"))
        .insert_header(("Cookie", "browser=1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("x-upstream").unwrap(), "motor");
    assert_eq!(test::read_body(resp).await, "{\"ok\":true}");

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(!received[0].headers.contains_key("x-auth-token"));
    assert_eq!(authenticator.calls(), 1);
}

#[actix_web::test]
async fn test_motor_proxy_relays_upstream_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/m1/busy"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance window"))
        .mount(&server)
        .await;
    let authenticator = TestFixtures::authenticator();
    let app = relay_app!(TestFixtures::settings(&motor_base(&server)), authenticator);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/motor-proxy/busy").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(test::read_body(resp).await, "maintenance window");
}

#[actix_web::test]
async fn test_motor_proxy_forwards_binary_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/m1/upload"))
        .respond_with(ResponseTemplate::new(201).set_body_bytes(vec![0_u8, 159, 146, 150]))
        .mount(&server)
        .await;
    let authenticator = TestFixtures::authenticator();
    let app = relay_app!(TestFixtures::settings(&motor_base(&server)), authenticator);

    let payload = vec![0xff_u8, 0x00, 0xfe, 0x01];
    let req = test::TestRequest::put()
        .uri("/api/motor-proxy/upload")
        .insert_header(("Content-Type", "application/octet-stream"))
        .set_payload(payload.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(test::read_body(resp).await.to_vec(), vec![0_u8, 159, 146, 150]);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].body, payload);
}

#[actix_web::test]
async fn test_unreachable_upstream_is_server_error() {
    let authenticator = TestFixtures::authenticator();
    let app = relay_app!(TestFixtures::settings("http://127.0.0.1:1/m1"), authenticator);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/motor-proxy/foo").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Proxy request failed");
}

#[actix_web::test]
async fn test_ebsco_proxy_rejects_missing_host() {
    let authenticator = TestFixtures::authenticator();
    let app = relay_app!(TestFixtures::settings("http://127.0.0.1:1/m1"), authenticator);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/ebsco-proxy/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
