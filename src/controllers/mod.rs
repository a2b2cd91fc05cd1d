use std::sync::Arc;

use axum::routing::{delete, get, patch, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::auth::TokenVerifier;
use crate::handlers::Handler;

mod comments;
mod posts;
mod reports;
mod users;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) handler: Handler,
    pub(crate) verifier: Arc<dyn TokenVerifier>,
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(greeting))
        .route("/users", post(users::create))
        .route("/users/{uid}/role", patch(users::promote))
        .route("/posts", post(posts::create).get(posts::feed))
        .route("/posts/user/{author_id}", get(posts::by_author))
        .route("/posts/{post_id}/vote", patch(posts::vote))
        .route("/posts/{post_id}", delete(posts::remove))
        .route("/comments", post(comments::create))
        .route("/comments/{id}", get(comments::by_post).delete(comments::remove))
        .route("/reports/comment", post(reports::file))
        .route("/reports", get(reports::list))
        .route("/reports/{report_id}/status", patch(reports::set_status))
        .route("/reports/{report_id}/delete", delete(reports::remove))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn greeting() -> &'static str {
    "Nerds are talking"
}

/// Raw pagination params. Anything non-numeric falls back to the
/// operation's defaults.
#[derive(Debug, Deserialize)]
pub(crate) struct PageParams {
    pub(crate) page: Option<String>,
    pub(crate) limit: Option<String>,
}

pub(crate) fn num(raw: &Option<String>) -> Option<u64> {
    raw.as_deref().and_then(|s| s.parse().ok())
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    pub(crate) message: String,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::testing::{claims, StaticVerifier};
    use crate::entities::Role;
    use crate::handlers::tests::{handler, user};
    use crate::repositories::{ReportRepository, UserRepository};

    async fn app() -> (Router, Handler) {
        let handler = handler();
        handler
            .user_repository
            .insert(user("root", Role::Admin))
            .await
            .unwrap();

        let verifier = StaticVerifier(HashMap::from([
            ("user-token".to_owned(), claims("u1", Some("a@x.com"))),
            ("admin-token".to_owned(), claims("root", None)),
        ]));

        let state = AppState {
            handler: handler.clone(),
            verifier: Arc::new(verifier),
        };

        (router(state), handler)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, body)
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }

        match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn register(app: &Router, token: &str, name: &str, email: &str) {
        let (status, _) = send(
            app,
            request(
                "POST",
                "/users",
                Some(token),
                Some(json!({ "name": name, "email": email })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    async fn make_post(app: &Router, token: &str) -> String {
        let (status, body) = send(
            app,
            request(
                "POST",
                "/posts",
                Some(token),
                Some(json!({ "title": "t", "content": "c", "tag": "rust" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        body["id"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn protected_routes_refuse_anonymous_and_bad_tokens() {
        let (app, _) = app().await;

        let (status, body) = send(
            &app,
            request(
                "PATCH",
                "/posts/00000000-0000-0000-0000-000000000000/vote",
                None,
                Some(json!({ "type": "upvote" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["message"].is_string());

        let (status, _) = send(
            &app,
            request(
                "PATCH",
                "/posts/00000000-0000-0000-0000-000000000000/vote",
                Some("forged-token"),
                Some(json!({ "type": "upvote" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_routes_refuse_plain_users() {
        let (app, _) = app().await;
        register(&app, "user-token", "Ada", "a@x.com").await;

        let (status, _) = send(&app, request("GET", "/reports", Some("user-token"), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, request("GET", "/reports", Some("admin-token"), None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn vote_flow_over_http() {
        let (app, _) = app().await;
        register(&app, "user-token", "Ada", "a@x.com").await;
        let post_id = make_post(&app, "user-token").await;

        let (status, body) = send(
            &app,
            request(
                "PATCH",
                &format!("/posts/{}/vote", post_id),
                Some("user-token"),
                // the body email is a display-only hint; membership follows
                // the verified claims
                Some(json!({ "type": "upvote", "email": "spoofed@x.com" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "upvote applied.");

        let (status, body) = send(&app, request("GET", "/posts", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["posts"][0]["upvotes"], 1);
        assert_eq!(body["posts"][0]["popularity"], 1);
        assert!(body["posts"][0].get("upvoters").is_none());

        let (status, _) = send(
            &app,
            request(
                "PATCH",
                &format!("/posts/{}/vote", post_id),
                Some("user-token"),
                Some(json!({ "type": "sideways" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn report_flow_over_http() {
        let (app, handler) = app().await;
        register(&app, "user-token", "Ada", "a@x.com").await;
        let post_id = make_post(&app, "user-token").await;

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/reports/comment",
                Some("user-token"),
                Some(json!({
                    "commentId": "3f0f5f3e-6a6c-4c2e-9d5e-5b8b3f6a0c11",
                    "postId": post_id,
                    "reason": "spam",
                    "commentContent": "bad words"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["reportedBy"], "u1");
        let report_id = body["id"].as_str().unwrap().to_owned();

        let (status, _) = send(
            &app,
            request(
                "PATCH",
                &format!("/reports/{}/status", report_id),
                Some("admin-token"),
                Some(json!({ "status": "resolved" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            request("GET", "/reports?status=resolved", Some("admin-token"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalReports"], 1);
        assert_eq!(body["reports"][0]["id"], report_id.as_str());

        let (status, _) = send(
            &app,
            request(
                "DELETE",
                &format!("/reports/{}/delete", report_id),
                Some("admin-token"),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let total = handler.report_repository.count(None).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn malformed_path_ids_are_invalid_arguments() {
        let (app, _) = app().await;
        register(&app, "user-token", "Ada", "a@x.com").await;

        let (status, body) = send(
            &app,
            request(
                "PATCH",
                "/posts/not-an-id/vote",
                Some("user-token"),
                Some(json!({ "type": "upvote" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }
}
