use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, furniture};

pub fn build_app(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(health))
        .merge(auth::router())
        .merge(furniture::router())
        .nest_service("/static", static_dir)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "online",
        "message": "Inventory API is running",
    }))
}

pub async fn serve(app: Router, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{Map, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "inventory-test-boundary";

    async fn body_json(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn form(method: &str, uri: &str, body: &str, token: Option<&str>) -> Request<Body> {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    fn multipart(uri: &str, filename: &str, data: &[u8], token: &str) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn login_token(app: &Router) -> String {
        let register = Request::builder()
            .method("POST")
            .uri("/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"email":"keeper@example.com","password":"password123"}"#,
            ))
            .unwrap();
        let res = app.clone().oneshot(register).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let user = body_json(res).await;
        assert_eq!(user["role"], "user");
        assert!(user.get("hashed_password").is_none());

        let res = app
            .clone()
            .oneshot(form(
                "POST",
                "/auth/login",
                "username=keeper%40example.com&password=password123",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let token = body_json(res).await;
        assert_eq!(token["token_type"], "bearer");
        token["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_online() {
        let (state, _tmp) = AppState::fake().await;
        let res = build_app(state).oneshot(get("/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "online");
    }

    #[tokio::test]
    async fn chair_lifecycle() {
        let (state, tmp) = AppState::fake().await;
        let app = build_app(state);
        let token = login_token(&app).await;

        let res = app
            .clone()
            .oneshot(form("POST", "/furniture/", "name=Chair", Some(&token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()[header::LOCATION], "/furniture/1");
        let created = body_json(res).await;
        assert_eq!(created["id"], 1);
        assert_eq!(created["photo_url"], Value::Null);

        let res = app.clone().oneshot(get("/furniture/1")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            body_json(res).await,
            serde_json::json!({"id": 1, "name": "Chair", "photo_url": null})
        );

        let photo = vec![0xFFu8; 2048];
        let res = app
            .clone()
            .oneshot(multipart("/furniture/1/photo", "photo.jpg", &photo, &token))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let uploaded = body_json(res).await;
        let url = uploaded["photo_url"].as_str().unwrap().to_string();
        assert!(url.starts_with("/static/item_photos/"));
        assert!(url.ends_with(".jpg"));
        assert_ne!(url, "/static/item_photos/photo.jpg");

        let res = app.clone().oneshot(get(&url)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let served = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(served.len(), photo.len());

        let res = app
            .clone()
            .oneshot(form("DELETE", "/furniture/1", "", Some(&token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["detail"], "Deleted");

        let res = app.clone().oneshot(get("/furniture/1")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(res).await["error"]["kind"], "not_found");

        let leftover = std::fs::read_dir(tmp.path().join("item_photos"))
            .unwrap()
            .count();
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn mutations_require_a_bearer_token() {
        let (state, _tmp) = AppState::fake().await;
        let app = build_app(state);

        let res = app
            .clone()
            .oneshot(form("POST", "/furniture/", "name=Chair", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await["error"]["code"], "missing_token");

        let res = app
            .clone()
            .oneshot(form("POST", "/furniture/", "name=Chair", Some("garbage")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await["error"]["code"], "invalid_token");

        let res = app.clone().oneshot(get("/furniture")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn oversized_photo_is_rejected_over_http() {
        let (state, _tmp) = AppState::fake().await;
        let app = build_app(state);
        let token = login_token(&app).await;

        app.clone()
            .oneshot(form("POST", "/furniture", "name=Wardrobe", Some(&token)))
            .await
            .unwrap();

        let big = vec![0u8; 6 * 1024 * 1024];
        let res = app
            .clone()
            .oneshot(multipart("/furniture/1/photo", "big.png", &big, &token))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"]["code"], "file_too_large");

        let res = app.clone().oneshot(get("/furniture/1")).await.unwrap();
        assert_eq!(body_json(res).await["photo_url"], Value::Null);
    }

    fn assert_invalid_input(status: StatusCode, body: &Value) {
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "validation_error");
        assert_eq!(body["error"]["code"], "invalid_input");
        assert!(body["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn malformed_requests_get_structured_errors() {
        let (state, _tmp) = AppState::fake().await;
        let app = build_app(state);
        let token = login_token(&app).await;

        let res = app
            .clone()
            .oneshot(form("POST", "/furniture/", "", Some(&token)))
            .await
            .unwrap();
        let status = res.status();
        assert_invalid_input(status, &body_json(res).await);

        let res = app.clone().oneshot(get("/furniture/abc")).await.unwrap();
        let status = res.status();
        assert_invalid_input(status, &body_json(res).await);

        let res = app
            .clone()
            .oneshot(form("PUT", "/furniture/abc", "name=Desk", Some(&token)))
            .await
            .unwrap();
        let status = res.status();
        assert_invalid_input(status, &body_json(res).await);

        let register = Request::builder()
            .method("POST")
            .uri("/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"x@y.io"}"#))
            .unwrap();
        let res = app.clone().oneshot(register).await.unwrap();
        let status = res.status();
        assert_invalid_input(status, &body_json(res).await);

        let res = app
            .clone()
            .oneshot(form("POST", "/auth/login", "username=x%40y.io", None))
            .await
            .unwrap();
        let status = res.status();
        assert_invalid_input(status, &body_json(res).await);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let (state, _tmp) = AppState::fake().await;
        let expired = state
            .tokens
            .issue(
                "keeper@example.com",
                Map::new(),
                Some(time::Duration::seconds(-30)),
            )
            .unwrap();
        let app = build_app(state);
        let token = login_token(&app).await;

        app.clone()
            .oneshot(form("POST", "/furniture/", "name=Chair", Some(&token)))
            .await
            .unwrap();

        let res = app
            .clone()
            .oneshot(form("PUT", "/furniture/1", "name=Throne", Some(&expired)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
        let body = body_json(res).await;
        assert_eq!(body["error"]["kind"], "unauthorized");
        assert_eq!(body["error"]["code"], "expired_token");

        let res = app.clone().oneshot(get("/furniture/1")).await.unwrap();
        assert_eq!(body_json(res).await["name"], "Chair");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let (state, _tmp) = AppState::fake().await;
        let app = build_app(state);
        login_token(&app).await;

        let again = Request::builder()
            .method("POST")
            .uri("/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"email":"keeper@example.com","password":"password456"}"#,
            ))
            .unwrap();
        let res = app.oneshot(again).await.unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(res).await["error"]["kind"], "conflict");
    }
}
