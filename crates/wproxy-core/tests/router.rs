use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wproxy_common::GlobalConfigPatch;
use wproxy_core::bootstrap::build_core;
use wproxy_core::into_app;

const HOME_PAGE: &str = r#"<html><head>
<script>var wpaicgParams = {"ajax_url":"/wp-admin/admin-ajax.php","search_nonce":"ab12cd34"};</script>
</head><body>
<form id="wpaicg-image-generator-form" method="post">
  <input type="hidden" name="_wpnonce" value="ffee0011" />
</form>
</body></html>"#;

const HELLO_STREAM: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"He\"}}]}\n\n\
                            data: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n\n\
                            data: [DONE]\n\n";

fn app(upstream: &str, api_key: Option<&str>) -> Router {
    let config = GlobalConfigPatch {
        upstream: Some(upstream.to_string()),
        api_key: api_key.map(str::to_string),
        ..Default::default()
    }
    .into_config()
    .unwrap();
    into_app(build_core(&config).unwrap().router())
}

async fn mount_home_page(server: &MockServer, expected_scrapes: u64) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HOME_PAGE))
        .expect(expected_scrapes)
        .mount(server)
        .await;
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(resp).await).unwrap()
}

#[tokio::test]
async fn models_are_listed_with_cors_and_request_id() {
    let server = MockServer::start().await;
    let resp = app(&server.uri(), None).oneshot(get("/v1/models")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert!(resp.headers().contains_key("x-wproxy-request-id"));
    let json = body_json(resp).await;
    assert_eq!(json["object"], "list");
    assert_eq!(json["data"].as_array().unwrap().len(), 8);
    assert_eq!(json["data"][1]["id"], "gpt-5.1");
}

#[tokio::test]
async fn chat_completion_concatenates_upstream_deltas() {
    let server = MockServer::start().await;
    mount_home_page(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/wp-admin/admin-ajax.php"))
        .and(body_string_contains("_wpnonce=ab12cd34"))
        .and(body_string_contains("action=wpaicg_chat_shortcode_message"))
        .and(body_string_contains("bot_id=1048"))
        .and(body_string_contains("message=hi"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(HELLO_STREAM),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resp = app(&server.uri(), None)
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({"model": "gpt-5.1", "messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["object"], "chat.completion");
    assert_eq!(json["model"], "gpt-5.1");
    assert_eq!(json["choices"][0]["message"]["content"], "Hello");
    assert!(json["id"].as_str().unwrap().starts_with("chatcmpl-"));
}

#[tokio::test]
async fn streamed_chat_ends_with_done() {
    let server = MockServer::start().await;
    mount_home_page(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/wp-admin/admin-ajax.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HELLO_STREAM))
        .mount(&server)
        .await;

    let resp = app(&server.uri(), None)
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({"stream": true, "messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "text/event-stream");
    assert_eq!(resp.headers()["cache-control"], "no-cache");
    let text = body_text(resp).await;
    assert!(text.ends_with("data: [DONE]\n\n"));

    let chunks: Vec<Value> = text
        .split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .filter(|payload| *payload != "[DONE]")
        .map(|payload| serde_json::from_str(payload).unwrap())
        .collect();
    assert_eq!(chunks.first().unwrap()["choices"][0]["delta"]["role"], "assistant");
    assert_eq!(chunks.last().unwrap()["choices"][0]["finish_reason"], "stop");
    let content: String = chunks
        .iter()
        .filter_map(|chunk| chunk["choices"][0]["delta"]["content"].as_str())
        .collect();
    assert_eq!(content, "Hello");
}

#[tokio::test]
async fn unknown_chat_model_uses_default_bot() {
    let server = MockServer::start().await;
    mount_home_page(&server, 1).await;
    Mock::given(method("POST"))
        .and(body_string_contains("bot_id=1048"))
        .and(body_string_contains("chatbot_identity=custom_bot_1048"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HELLO_STREAM))
        .expect(1)
        .mount(&server)
        .await;

    let resp = app(&server.uri(), None)
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({"model": "gpt-4o", "messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["model"], "gpt-4o");
}

#[tokio::test]
async fn rejected_chat_call_rescrapes_and_retries_once() {
    let server = MockServer::start().await;
    mount_home_page(&server, 2).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("-1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HELLO_STREAM))
        .expect(1)
        .mount(&server)
        .await;

    let resp = app(&server.uri(), None)
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({"messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["choices"][0]["message"]["content"], "Hello");
}

#[tokio::test]
async fn empty_upstream_reply_is_a_server_error() {
    let server = MockServer::start().await;
    mount_home_page(&server, 1).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("data: [DONE]\n\n"))
        .mount(&server)
        .await;

    let resp = app(&server.uri(), None)
        .oneshot(post_json(
            "/v1/chat/completions",
            json!({"messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "No response from upstream"})
    );
}

#[tokio::test]
async fn image_generation_uses_form_nonce() {
    let server = MockServer::start().await;
    mount_home_page(&server, 1).await;
    Mock::given(method("POST"))
        .and(body_string_contains("_wpnonce=ffee0011"))
        .and(body_string_contains("action=wpaicg_image_generator"))
        .and(body_string_contains("img_size=1024x1024"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "imgs": ["https://cdn.test/cat.jpg"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = app(&server.uri(), None)
        .oneshot(post_json(
            "/v1/images/generations",
            json!({"model": "dall-e-2", "prompt": "a cat", "size": "999x999"}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(
        json["data"],
        json!([{"url": "https://cdn.test/cat.jpg", "revised_prompt": "a cat"}])
    );
    assert!(json["created"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn image_nonce_rejection_is_unauthorized_with_details() {
    let server = MockServer::start().await;
    mount_home_page(&server, 1).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("-1"))
        .mount(&server)
        .await;

    let resp = app(&server.uri(), None)
        .oneshot(post_json("/v1/images/generations", json!({"prompt": "a cat"})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(resp).await,
        json!({
            "error": "Nonce verification failed - try refreshing the source page",
            "details": "-1"
        })
    );
}

#[tokio::test]
async fn wrong_model_kind_is_a_bad_request() {
    let server = MockServer::start().await;
    let resp = app(&server.uri(), None)
        .oneshot(post_json(
            "/v1/images/generations",
            json!({"model": "gpt-5-nano", "prompt": "x"}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "Model is not an image model"})
    );
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let server = MockServer::start().await;
    let req = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app(&server.uri(), None).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"].is_string());
}

#[tokio::test]
async fn api_key_gate_reports_each_failure() {
    let server = MockServer::start().await;
    let app = app(&server.uri(), Some("sk-test"));

    let resp = app.clone().oneshot(get("/v1/models")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        body_json(resp).await,
        json!({"error": "缺少授權標頭 / Missing Authorization header"})
    );

    let wrong = Request::builder()
        .uri("/v1/models")
        .header("authorization", "Bearer sk-nope")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(wrong).await.unwrap();
    assert_eq!(
        body_json(resp).await,
        json!({"error": "無效的 API Key / Invalid API Key"})
    );

    let ok = Request::builder()
        .uri("/v1/models")
        .header("authorization", "bearer sk-test")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(ok).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn preflight_favicon_and_unknown_paths() {
    let server = MockServer::start().await;
    let app = app(&server.uri(), Some("sk-test"));

    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/v1/chat/completions")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(preflight).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        resp.headers()["access-control-allow-methods"],
        "GET, POST, OPTIONS"
    );
    assert_eq!(
        resp.headers()["access-control-allow-headers"],
        "Content-Type, Authorization"
    );

    let resp = app.clone().oneshot(get("/favicon.ico")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.oneshot(get("/v2/nothing")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await, json!({"error": "Not Found"}));
}

#[tokio::test]
async fn unknown_api_paths_are_behind_the_key_check() {
    let server = MockServer::start().await;
    let app = app(&server.uri(), Some("sk-test"));

    let resp = app.clone().oneshot(get("/v1/embeddings")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "缺少授權標頭 / Missing Authorization header"})
    );

    let authorized = Request::builder()
        .uri("/v1/embeddings")
        .header("authorization", "Bearer sk-test")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(authorized).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert_eq!(body_json(resp).await, json!({"error": "Not Found"}));
}
