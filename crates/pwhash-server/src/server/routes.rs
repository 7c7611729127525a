//! HTTP routes for the password hashing service.
//!
//! | Method | Path          | Response                                        |
//! |--------|---------------|-------------------------------------------------|
//! | POST   | `/hash`       | New request ID as plain text                    |
//! | GET    | `/hash/{id}`  | Digest, or an empty body if absent or malformed |
//! | GET    | `/stats`      | `{"total": N, "average": M}`                    |
//! | GET    | `/shutdown`   | Empty; the listener stops after the delay       |
//!
//! Any other method on these paths is logged and answered with
//! `405 Method Not Allowed` without touching the hashing core.

use crate::server::telemetry::{
    increment_hash_requests, increment_stats_requests, increment_unsupported_methods,
    record_result_lookup,
};
use axum::{
    Form, Json, Router,
    extract::{
        Path, Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::{Method, StatusCode, Uri},
    routing::{get, post},
};
use pwhash::{HashService, Stats};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct HashForm {
    password: Option<String>,
}

pub fn router(service: HashService) -> Router {
    Router::new()
        .route("/hash", post(submit_hash).fallback(unsupported_method))
        .route("/hash/", get(fetch_missing_id).fallback(unsupported_method))
        .route("/hash/{id}", get(fetch_hash).fallback(unsupported_method))
        .route("/stats", get(stats).fallback(unsupported_method))
        .route("/shutdown", get(shutdown).fallback(unsupported_method))
        .with_state(service)
}

/// Reads `password` from the urlencoded body, falling back to the query
/// string. Anything unreadable counts as absent, so the empty string is hashed.
async fn submit_hash(
    State(service): State<HashService>,
    query: Result<Query<HashForm>, QueryRejection>,
    form: Result<Form<HashForm>, FormRejection>,
) -> String {
    let body = match form {
        Ok(Form(form)) => form,
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Unreadable hash form: {_e}");
            HashForm::default()
        }
    };
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let password = body.password.or(query.password).unwrap_or_default();

    increment_hash_requests();
    service.submit(password).to_string()
}

async fn fetch_hash(State(service): State<HashService>, Path(raw): Path<String>) -> String {
    #[cfg(feature = "tracing")]
    tracing::info!("Processing result request {raw}");

    let digest = service.fetch_raw(&raw);
    record_result_lookup(digest.is_some());
    digest.map(String::from).unwrap_or_default()
}

async fn fetch_missing_id() -> String {
    #[cfg(feature = "tracing")]
    tracing::warn!("Result request without an id");

    record_result_lookup(false);
    String::new()
}

async fn stats(State(service): State<HashService>) -> Json<Stats> {
    #[cfg(feature = "tracing")]
    tracing::info!("Processing stats request");

    increment_stats_requests();
    Json(service.stats())
}

async fn shutdown(State(service): State<HashService>) -> StatusCode {
    let _scheduled = service.trigger_shutdown();

    #[cfg(feature = "tracing")]
    {
        if _scheduled {
            tracing::info!("Shutdown scheduled in {:?}", service.processing_delay());
        } else {
            tracing::info!("Shutdown already in progress");
        }
    }

    StatusCode::OK
}

async fn unsupported_method(_method: Method, _uri: Uri) -> StatusCode {
    #[cfg(feature = "tracing")]
    tracing::warn!("Undefined behavior for HTTP method {_method} on {_uri}");

    increment_unsupported_methods();
    StatusCode::METHOD_NOT_ALLOWED
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use core::time::Duration;
    use pwhash::{HashConfig, hash_password};
    use tower::ServiceExt;

    const DELAY: Duration = Duration::from_secs(5);

    fn service(initial_request_id: u64) -> HashService {
        HashService::new(HashConfig {
            processing_delay: DELAY,
            initial_request_id,
        })
    }

    async fn send(service: &HashService, request: Request<Body>) -> (StatusCode, String) {
        let response = router(service.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn hash_round_trip() {
        let service = service(4);

        let (status, body) = send(&service, post_form("/hash", "password=angryMonkey")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "5");

        let (status, body) = send(&service, get_request("/hash/5")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "");

        tokio::time::sleep(DELAY + Duration::from_millis(1)).await;

        let (status, body) = send(&service, get_request("/hash/5")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, hash_password("angryMonkey").as_str());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_form_hashes_empty_password() {
        let service = service(0);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/hash")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(&service, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1");

        service.drain(DELAY * 2).await.unwrap();
        assert_eq!(service.fetch_raw("1"), Some(hash_password("")));
    }

    #[tokio::test(start_paused = true)]
    async fn password_falls_back_to_query_string() {
        let service = service(0);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/hash?password=fromQuery")
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(&service, request).await;
        assert_eq!(body, "1");

        let (_, body) = send(
            &service,
            post_form("/hash?password=fromQuery", "password=fromBody"),
        )
        .await;
        assert_eq!(body, "2");

        let (_, body) = send(&service, post_form("/hash?password=fromQuery", "password=")).await;
        assert_eq!(body, "3");

        service.drain(DELAY * 2).await.unwrap();
        assert_eq!(service.fetch_raw("1"), Some(hash_password("fromQuery")));
        assert_eq!(service.fetch_raw("2"), Some(hash_password("fromBody")));
        assert_eq!(service.fetch_raw("3"), Some(hash_password("")));
    }

    #[tokio::test]
    async fn malformed_or_unknown_ids_return_empty_body() {
        let service = service(0);
        for uri in ["/hash/abc", "/hash/-1", "/hash/%2B1", "/hash/42", "/hash/"] {
            let (status, body) = send(&service, get_request(uri)).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body, "", "{uri}");
        }
    }

    #[tokio::test]
    async fn stats_before_any_completion() {
        let service = service(0);
        let response = router(service.clone())
            .oneshot(get_request("/stats"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "total": 0, "average": 0 }));
    }

    #[tokio::test(start_paused = true)]
    async fn stats_count_completed_requests() {
        let service = service(0);
        for password in ["a", "b", "c"] {
            let body = format!("password={password}");
            let request = Request::builder()
                .method(Method::POST)
                .uri("/hash")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap();
            send(&service, request).await;
        }
        service.drain(DELAY * 2).await.unwrap();

        let (_, body) = send(&service, get_request("/stats")).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["total"], 3);
        assert!(json["average"].is_u64());
    }

    #[tokio::test]
    async fn wrong_method_never_reaches_the_core() {
        let service = service(0);
        let cases = [
            (Method::GET, "/hash"),
            (Method::PUT, "/hash"),
            (Method::POST, "/hash/1"),
            (Method::DELETE, "/stats"),
            (Method::POST, "/shutdown"),
        ];
        for (method, uri) in cases {
            let request = Request::builder()
                .method(method.clone())
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let (status, _) = send(&service, request).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
        }
        assert_eq!(service.last_request_id(), 0);
        assert!(!service.is_shutting_down());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_takes_effect_after_delay() {
        let service = service(0);
        let (status, body) = send(&service, get_request("/shutdown")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "");
        assert!(!service.is_shutting_down());

        tokio::time::sleep(DELAY + Duration::from_millis(1)).await;
        assert!(service.is_shutting_down());
    }
}
