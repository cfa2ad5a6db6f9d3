//! HTTP API tests
//!
//! Drives the router end to end against the in-memory store:
//! - Status codes and the error body shape
//! - Acting-user header handling
//! - Part, document, supply and pending-queue endpoints

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::*;
use partstock_backend::create_app;
use partstock_backend::middleware::ACTOR_HEADER;

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(ACTOR_HEADER, Uuid::new_v4().to_string());
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Health reports the store as reachable
    #[tokio::test]
    async fn test_health() {
        let app = create_app(state());
        let (status, _) = send(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    /// Registering a part returns 201 with its stock status
    #[tokio::test]
    async fn test_create_and_fetch_part() {
        let app = create_app(state());

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/parts",
            Some(json!({ "code": "brg-6204", "name": "Ball bearing", "stock": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["code"], "brg-6204");
        assert_eq!(body["stock"], 0);
        assert_eq!(body["stock_status"], "out_of_stock");

        let (status, body) = send(&app, Method::GET, "/api/v1/parts?code=BRG-6204", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/parts",
            Some(json!({ "code": "BRG-6204", "name": "Duplicate" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    /// Missing or malformed actor header is a 400
    #[tokio::test]
    async fn test_actor_header_is_required() {
        let app = create_app(state());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/parts")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "code": "X", "name": "X" }).to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["context"]["field"], ACTOR_HEADER);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/parts")
            .header(ACTOR_HEADER, "not-a-uuid")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "code": "X", "name": "X" }).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    /// Overselling returns 422 with the stock figures in the body
    #[tokio::test]
    async fn test_insufficient_stock_response() {
        let state = state();
        let part = seed_part(&state, "BRK-01", 5).await;
        let app = create_app(state.clone());

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/documents/outgoing",
            Some(json!({
                "status": "completed",
                "items": [{ "part_id": part.id, "qty": 6 }],
            })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");
        assert_eq!(body["error"]["retryable"], false);
        assert_eq!(body["error"]["context"]["part_code"], "BRK-01");
        assert_eq!(body["error"]["context"]["available"], 5);
        assert_eq!(body["error"]["context"]["required"], 6);
        assert_eq!(stock_of(&state, &part).await, 5);
    }

    /// Full outgoing round trip through the API
    #[tokio::test]
    async fn test_document_round_trip() {
        let state = state();
        let part = seed_part(&state, "OIL-5W30", 40).await;
        let app = create_app(state.clone());

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/v1/documents/outgoing",
            Some(json!({
                "status": "completed",
                "items": [{ "part_id": part.id, "qty": 15 }],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "completed");
        assert_eq!(stock_of(&state, &part).await, 25);

        let id = created["id"].as_str().unwrap().to_string();

        let (status, movements) =
            send(&app, Method::GET, "/api/v1/movements?type=out&part_code=oil", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(movements[0]["stock_before"], 40);
        assert_eq!(movements[0]["stock_after"], 25);
        assert_eq!(movements[0]["part_code"], "OIL-5W30");

        let (status, confirmed) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/outgoing/{id}/confirmation"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(confirmed["confirmed"], true);

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/documents/outgoing/{id}"),
            Some(json!({
                "status": "completed",
                "items": [{ "part_id": part.id, "qty": 1 }],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
        assert_eq!(body["error"]["context"]["confirmed"], true);

        let (status, cancelled) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/outgoing/{id}/cancel"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cancelled["status"], "cancelled");
        assert_eq!(stock_of(&state, &part).await, 40);

        let (status, report) = send(
            &app,
            Method::GET,
            &format!("/api/v1/parts/{}/reconcile", part.id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["drift"], 0);
    }

    /// Next number for outgoing and request documents
    #[tokio::test]
    async fn test_next_number() {
        let app = create_app(state());

        let (status, body) = send(&app, Method::GET, "/api/v1/documents/request/next-number", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "request");
        assert_eq!(body["number"], "1");

        let (status, body) = send(&app, Method::GET, "/api/v1/documents/outgoing/next-number", None).await;
        assert_eq!(status, StatusCode::OK);
        let number = body["number"].as_str().unwrap();
        assert!(number.starts_with("OUT-"));
        assert!(number.ends_with("-001"));

        let (status, _) = send(&app, Method::GET, "/api/v1/documents/receiving/next-number", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    /// Supplying a request item over HTTP
    #[tokio::test]
    async fn test_supply_endpoint() {
        let state = state();
        let part = seed_part(&state, "BRK-01", 10).await;
        let req = state
            .lifecycle()
            .create(&ctx(), shared::DocumentKind::Request, request("Line 2", &[(&part, 10)]))
            .await
            .unwrap();
        let app = create_app(state.clone());
        let uri = format!("/api/v1/request-items/{}/supply", req.items[0].id);

        let (status, body) = send(
            &app,
            Method::POST,
            &uri,
            Some(json!({ "scanned_code": "BRK-99" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "PART_MISMATCH");

        let (status, body) = send(
            &app,
            Method::POST,
            &uri,
            Some(json!({ "scanned_code": "brk-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item"]["is_supplied"], true);
        assert_eq!(body["movement"]["stock_after"], 0);
        assert_eq!(stock_of(&state, &part).await, 0);
    }

    /// PUT edits attributes and ignores a stock field in the body
    #[tokio::test]
    async fn test_update_part_endpoint() {
        let state = state();
        let part = seed_part(&state, "HOSE-10", 7).await;
        let app = create_app(state.clone());
        let uri = format!("/api/v1/parts/{}", part.id);

        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(json!({
                "code": "HOSE-10",
                "name": "Hydraulic hose",
                "stock": 999,
                "customer_code": "C-77",
                "standard_packing": 5,
                "address": "Rack A1",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Hydraulic hose");
        assert_eq!(body["customer_code"], "C-77");
        assert_eq!(body["standard_packing"], 5);
        assert_eq!(body["address"], "Rack A1");
        assert_eq!(body["stock"], 7);
        assert_eq!(stock_of(&state, &part).await, 7);

        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(json!({ "code": "HOSE-10", "name": "Hose", "standard_packing": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    /// The pending queue lists completed, unsupplied request items
    #[tokio::test]
    async fn test_pending_request_items_endpoint() {
        let state = state();
        let part = seed_part(&state, "SEAL-3", 9).await;
        let lifecycle = state.lifecycle();
        lifecycle
            .create(&ctx(), shared::DocumentKind::Request, request("Draft", &[(&part, 1)]))
            .await
            .unwrap();
        let completed = lifecycle
            .create(
                &ctx(),
                shared::DocumentKind::Request,
                shared::DocumentInput::new(shared::DocumentStatus::Completed, items(&[(&part, 2)]))
                    .with_destination("Press 4"),
            )
            .await
            .unwrap();
        let app = create_app(state.clone());

        let (status, body) = send(&app, Method::GET, "/api/v1/request-items/pending", None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], completed.items[0].id.to_string());
        assert_eq!(rows[0]["request_number"], completed.number);
        assert_eq!(rows[0]["destination"], "Press 4");
        assert_eq!(rows[0]["part_code"], "SEAL-3");
        assert_eq!(rows[0]["is_supplied"], false);
    }

    /// Unknown document kinds and ids
    #[tokio::test]
    async fn test_unknown_resources() {
        let app = create_app(state());

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/documents/outgoing/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (status, _) = send(&app, Method::GET, "/api/v1/documents/invoices", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
