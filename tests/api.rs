mod common;

use actix_web::{body::to_bytes, dev::Service, http::StatusCode, test, web, App};
use common::{add_entry, gateway_with, FakeProvider};
use heritage_ai::api::middleware::{ApiKeyAuth, Role};
use heritage_ai::api::routes;
use heritage_ai::config::{ApiKeyConfig, AppConfig};
use heritage_ai::llm::ProviderError;
use serde_json::{json, Value};

fn app_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.api_keys = vec![
        ApiKeyConfig {
            key: "alice-key".into(),
            user_id: "alice".into(),
            role: Role::User,
        },
        ApiKeyConfig {
            key: "bob-key".into(),
            user_id: "bob".into(),
            role: Role::User,
        },
    ];
    config
}

macro_rules! app {
    ($gateway:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(app_config()))
                .app_data(web::Data::new($gateway))
                .service(routes::health)
                .wrap(ApiKeyAuth)
                .configure(routes::configure),
        )
        .await
    };
}

fn bearer(key: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", key))
}

#[actix_web::test]
async fn health_needs_no_key() {
    let (gateway, _pool) = gateway_with(None);
    let app = app!(gateway);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "healthy");
}

#[actix_web::test]
async fn missing_or_unknown_key_is_unauthorized() {
    let (gateway, _pool) = gateway_with(None);
    let app = app!(gateway);

    for req in [
        test::TestRequest::get().uri("/ai/status").to_request(),
        test::TestRequest::get()
            .uri("/ai/status")
            .insert_header(bearer("nope"))
            .to_request(),
    ] {
        let err = match app.call(req).await {
            Ok(_) => panic!("request should be rejected"),
            Err(e) => e,
        };
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert!(body["message"].is_string());
    }
}

#[actix_web::test]
async fn status_reports_unconfigured_provider() {
    let (gateway, _pool) = gateway_with(None);
    let app = app!(gateway);

    let req = test::TestRequest::get()
        .uri("/ai/status")
        .insert_header(bearer("alice-key"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["available"], false);
}

#[actix_web::test]
async fn generation_without_provider_is_unavailable() {
    let (gateway, _pool) = gateway_with(None);
    let app = app!(gateway);

    let req = test::TestRequest::post()
        .uri("/ai/ask")
        .insert_header(bearer("alice-key"))
        .set_json(json!({"question": "What is Diwali?"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "AI service is not configured");
}

#[actix_web::test]
async fn invalid_input_lists_field_errors() {
    let (gateway, _pool) = gateway_with(None);
    let app = app!(gateway);

    let req = test::TestRequest::post()
        .uri("/ai/ask")
        .insert_header(bearer("alice-key"))
        .set_json(json!({"question": "", "temperature": 3.0}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["question", "temperature"]);

    let req = test::TestRequest::post()
        .uri("/ai/ask")
        .insert_header(bearer("alice-key"))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0]["field"], "body");

    let req = test::TestRequest::get()
        .uri("/ai/conversations/not-a-uuid")
        .insert_header(bearer("alice-key"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn conversation_round_trip_over_http() {
    let provider = FakeProvider::replying("Diwali is the festival of lights.");
    let (gateway, _pool) = gateway_with(Some(provider));
    let app = app!(gateway);

    let req = test::TestRequest::post()
        .uri("/ai/ask")
        .insert_header(bearer("alice-key"))
        .set_json(json!({"question": "What is Diwali?"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["answer"], "Diwali is the festival of lights.");
    assert_eq!(body["data"]["provider"], "fake");
    let id = body["data"]["conversationId"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/ai/conversations")
        .insert_header(bearer("alice-key"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["id"], id.as_str());
    assert_eq!(body["data"][0]["messageCount"], 2);

    let req = test::TestRequest::get()
        .uri(&format!("/ai/conversations/{}", id))
        .insert_header(bearer("bob-key"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&format!("/ai/conversations/{}/export", id))
        .insert_header(bearer("alice-key"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = test::read_body(resp).await;
    let text = std::str::from_utf8(&text).unwrap();
    assert!(text.contains("[USER]: What is Diwali?"));

    let req = test::TestRequest::delete()
        .uri(&format!("/ai/conversations/{}", id))
        .insert_header(bearer("alice-key"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Conversation deleted");

    let req = test::TestRequest::get()
        .uri(&format!("/ai/conversations/{}", id))
        .insert_header(bearer("alice-key"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn provider_errors_map_to_status_codes() {
    for (error, status) in [
        (ProviderError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
        (ProviderError::QuotaExceeded, StatusCode::SERVICE_UNAVAILABLE),
        (ProviderError::Unavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
        (ProviderError::ContextTooLong, StatusCode::BAD_REQUEST),
        (ProviderError::Unknown("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ] {
        let (gateway, _pool) = gateway_with(Some(FakeProvider::failing(error)));
        let app = app!(gateway);

        let req = test::TestRequest::post()
            .uri("/ai/tags")
            .insert_header(bearer("alice-key"))
            .set_json(json!({"title": "Kente", "description": "Woven silk and cotton cloth"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), status);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        // Production mode never leaks internal detail.
        assert!(!body["message"].as_str().unwrap().contains("boom"));
    }
}

#[actix_web::test]
async fn entry_bodies_are_optional_but_must_be_valid() {
    let provider = FakeProvider::replying("Consider naming the village.");
    let (gateway, pool) = gateway_with(Some(provider.clone()));
    let entry = add_entry(&pool, "alice", "Batik", true);
    let app = app!(gateway);

    let suggestions = format!("/ai/entries/{}/suggestions", entry.id);
    let analyze = format!("/ai/entries/{}/analyze", entry.id);

    for (uri, body) in [
        (&suggestions, r#"{"focus": 42}"#),
        (&suggestions, "{not json"),
        (&analyze, r#"{"temperature": "hot"}"#),
    ] {
        let req = test::TestRequest::post()
            .uri(uri)
            .insert_header(bearer("alice-key"))
            .insert_header(("Content-Type", "application/json"))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {}", body);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"][0]["field"], "body");
    }
    assert_eq!(provider.calls(), 0);

    let req = test::TestRequest::post()
        .uri(&suggestions)
        .insert_header(bearer("alice-key"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["focus"], "general");

    let req = test::TestRequest::post()
        .uri(&suggestions)
        .insert_header(bearer("alice-key"))
        .set_json(json!({"focus": "title"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["focus"], "title");

    let req = test::TestRequest::post()
        .uri(&analyze)
        .insert_header(bearer("alice-key"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(provider.calls(), 3);
}
