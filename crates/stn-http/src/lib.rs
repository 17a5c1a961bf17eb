//! HTTP surface: ingestion endpoints plus article and documentation pages.

pub mod api;
pub mod pages;
pub mod render;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use stn_core::{ingest::Ingestor, store::ArticleStore};

use crate::render::PageRenderer;

#[derive(Clone)]
pub struct AppState {
    pub ingestor: Arc<Ingestor>,
    pub articles: Arc<dyn ArticleStore>,
    pub renderer: Arc<PageRenderer>,
    pub version: String,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/version", get(pages::version))
        .route("/changelog", get(pages::changelog))
        .route("/asserts/{file}", get(pages::asset))
        .route("/html/", get(pages::example))
        .route("/html/{article_id}", get(pages::article))
        .route("/api/{public_id}/json", post(api::ingest_json))
        .route("/api/{public_id}/get", get(api::ingest_query))
        .route("/api/{public_id}/form", post(api::ingest_form))
        .route("/api/{public_id}/file", post(api::ingest_file))
        .fallback(pages::not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use stn_core::{
        dispatch::Dispatcher,
        domain::{Article, ChatId, ChatProfile, UserId},
        messaging::types::ParseMode,
        registry::Registry,
        store::memory::MemoryStore,
        testing::RecordingMessenger,
    };

    use super::*;

    struct Harness {
        app: Router,
        messenger: Arc<RecordingMessenger>,
        registry: Arc<Registry>,
        store: Arc<MemoryStore>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let messenger = Arc::new(RecordingMessenger::new(UserId(1)));
        let registry = Arc::new(Registry::new(store.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            messenger.clone(),
            store.clone(),
            "https://relay.test",
        ));
        let state = AppState {
            ingestor: Arc::new(Ingestor::new(registry.clone(), dispatcher)),
            articles: store.clone(),
            renderer: Arc::new(PageRenderer::new().unwrap()),
            version: "9.9.9".to_string(),
        };
        Harness {
            app: router(state, 1024 * 1024),
            messenger,
            registry,
            store,
        }
    }

    async fn subscribe(h: &Harness, chat: i64) -> String {
        h.registry
            .get_or_create(ChatId(chat), &ChatProfile::default())
            .await
            .unwrap()
            .subscription
            .public_id
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn json_delivery_to_subscribed_chat() {
        let h = harness();
        let p1 = subscribe(&h, 100).await;

        let response = h
            .app
            .clone()
            .oneshot(post_json(
                &format!("/api/{p1}/json"),
                r#"{"encrypted":false,"msg":"hi","format":"plain"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["message"], "Message sent");

        let sent = h.messenger.sent_texts();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, ChatId(100));
        assert_eq!(sent[0].text, "hi");
        assert_eq!(sent[0].mode, ParseMode::Plain);
    }

    #[tokio::test]
    async fn json_endpoint_ignores_content_type() {
        let h = harness();
        let p1 = subscribe(&h, 100).await;

        let response = h
            .app
            .clone()
            .oneshot(
                Request::post(format!("/api/{p1}/json"))
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(r#"{"msg":"hi","format":"plain"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "Message sent");
        assert_eq!(h.messenger.texts_to(ChatId(100)), vec!["hi".to_string()]);

        let response = h
            .app
            .clone()
            .oneshot(
                Request::post(format!("/api/{p1}/json"))
                    .body(Body::from(r#"{"msg":"again"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.messenger.sent_texts().len(), 2);
    }

    #[tokio::test]
    async fn disabled_subscription_is_404_without_send() {
        let h = harness();
        let p1 = subscribe(&h, 100).await;
        h.registry.disable(ChatId(100)).await.unwrap();

        let response = h
            .app
            .clone()
            .oneshot(post_json(
                &format!("/api/{p1}/json"),
                r#"{"encrypted":false,"msg":"hi","format":"plain"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["ok"], false);
        assert!(h.messenger.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn unknown_id_is_404_even_with_malformed_body() {
        let h = harness();
        let response = h
            .app
            .clone()
            .oneshot(post_json(
                "/api/0123456789abcdef0123456789abcdef/json",
                "{not json",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_or_empty_payload_is_400() {
        let h = harness();
        let p1 = subscribe(&h, 100).await;

        let bad_json = h
            .app
            .clone()
            .oneshot(post_json(&format!("/api/{p1}/json"), "{not json"))
            .await
            .unwrap();
        assert_eq!(bad_json.status(), StatusCode::BAD_REQUEST);

        let empty = h
            .app
            .clone()
            .oneshot(
                Request::get(format!("/api/{p1}/get?msg="))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(empty).await["message"], "Invalid message");
    }

    #[tokio::test]
    async fn short_ciphertext_is_400_without_send() {
        let h = harness();
        let p1 = subscribe(&h, 100).await;
        // 31 zero bytes, base64.
        let payload = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA==";
        let response = h
            .app
            .clone()
            .oneshot(post_json(
                &format!("/api/{p1}/json"),
                &format!(r#"{{"encrypted":true,"msg":"{payload}"}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Failed to decrypt message");
        assert!(h.messenger.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn query_and_form_default_to_markdown() {
        let h = harness();
        let p1 = subscribe(&h, 7).await;

        let response = h
            .app
            .clone()
            .oneshot(
                Request::get(format!("/api/{p1}/get?msg=v1.2%20ok"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = h
            .app
            .clone()
            .oneshot(
                Request::post(format!("/api/{p1}/form"))
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("msg=a-b&format=in-app-html"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let sent = h.messenger.sent_texts();
        assert_eq!(sent[0].text, r"v1\.2 ok");
        assert_eq!(sent[0].mode, ParseMode::MarkdownV2);
        assert_eq!(sent[1].text, "a-b");
        assert_eq!(sent[1].mode, ParseMode::Html);
    }

    #[tokio::test]
    async fn file_upload_sends_document_then_caption() {
        let h = harness();
        let p1 = subscribe(&h, 7).await;
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"report.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             all green\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"caption\"\r\n\r\n\
             nightly\r\n\
             --{boundary}--\r\n"
        );

        let response = h
            .app
            .clone()
            .oneshot(
                Request::post(format!("/api/{p1}/file"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "File sent");
        let docs = h.messenger.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].file_name, "report.txt");
        assert_eq!(docs[0].bytes, b"all green");
        assert_eq!(h.messenger.texts_to(ChatId(7)), vec!["nightly".to_string()]);
    }

    #[tokio::test]
    async fn file_endpoint_without_file_is_400() {
        let h = harness();
        let p1 = subscribe(&h, 7).await;
        let response = h
            .app
            .clone()
            .oneshot(
                Request::post(format!("/api/{p1}/file"))
                    .header(header::CONTENT_TYPE, "multipart/form-data; boundary=B")
                    .body(Body::from("--B\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\nx\r\n--B--\r\n"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(h.messenger.documents().is_empty());
    }

    #[tokio::test]
    async fn server_html_link_resolves_to_rendered_article() {
        let h = harness();
        let p1 = subscribe(&h, 7).await;
        h.app
            .clone()
            .oneshot(post_json(
                &format!("/api/{p1}/json"),
                r##"{"msg":"# Weekly\n\n*done*","format":"server-html"}"##,
            ))
            .await
            .unwrap();

        let link = h.messenger.sent_texts()[0].text.clone();
        let path = link.strip_prefix("https://relay.test").unwrap().to_string();
        let response = h
            .app
            .clone()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("<title>Weekly</title>"));
        assert!(html.contains("<em>done</em>"));
    }

    #[tokio::test]
    async fn unknown_article_redirects_to_404() {
        let h = harness();
        h.store
            .create_article(&Article {
                article_id: "known".to_string(),
                raw_content: "x".to_string(),
            })
            .await
            .unwrap();

        let response = h
            .app
            .clone()
            .oneshot(Request::get("/html/unknown").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/404");

        let response = h
            .app
            .clone()
            .oneshot(Request::get("/404").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], "404 Not Found");
    }

    async fn get_text(h: &Harness, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = h
            .app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn changelog_and_example_pages_render() {
        let h = harness();

        let (status, _, html) = get_text(&h, "/changelog").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<title>Changelog</title>"));

        let (status, _, html) = get_text(&h, "/html/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<title>Rendering Example</title>"));
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>strikethrough</del>"));
    }

    #[tokio::test]
    async fn embedded_assets_are_served() {
        let h = harness();

        let (status, content_type, css) = get_text(&h, "/asserts/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/css; charset=utf-8"));
        assert!(css.contains("border-collapse"));

        let (status, content_type, _) = get_text(&h, "/asserts/favicon.svg").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/svg+xml"));

        let (status, _, body) = get_text(&h, "/asserts/missing.js").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("404 Not Found"));
    }

    #[tokio::test]
    async fn index_and_version() {
        let h = harness();
        let response = h
            .app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = h
            .app
            .clone()
            .oneshot(Request::get("/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"9.9.9");
    }
}
