//! HTTP API - axum router over the core booking operations.
//!
//! Every response uses the JSON envelope from [`response`]; errors are
//! mapped to status codes in [`error`].

pub mod booking;
pub mod catalog;
pub mod cors;
pub mod error;
pub mod response;
pub mod tickets;

use crate::{config::AppConfig, payment_gateway::PaymentGateway};
use axum::{
    Router,
    response::Response,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool shared by handlers and jobs
    pub db: DatabaseConnection,
    /// Creates payment links and verifies webhook signatures
    pub gateway: Arc<dyn PaymentGateway>,
    /// Booking policy, pricing and payment settings
    pub config: Arc<AppConfig>,
}

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

/// `GET /health`
pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "cinema-booking",
    };
    response::success(payload, "Health check successful")
}

/// Builds the router with every route, request tracing and CORS.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/films", get(catalog::list_films).post(catalog::create_film))
        .route("/films/:id", get(catalog::get_film))
        .route("/films/:id/versions", post(catalog::add_film_version))
        .route(
            "/film-versions/:id/showtimes",
            get(catalog::list_version_showtimes),
        )
        .route("/rooms", post(catalog::create_room))
        .route("/rooms/:id/seats", get(catalog::list_room_seats))
        .route("/showtimes", post(catalog::create_showtime))
        .route("/showtimes/:id", get(catalog::get_showtime))
        .route("/showtimes/:id/cancel", post(catalog::cancel_showtime))
        .route("/showtimes/:id/seats", get(catalog::showtime_seat_map))
        .route(
            "/showtimes/:id/holds",
            post(booking::hold_seats).delete(booking::release_holds),
        )
        .route(
            "/combos",
            get(catalog::list_combos).post(catalog::create_combo),
        )
        .route("/combos/:id/active", post(catalog::set_combo_active))
        .route("/vouchers", post(catalog::create_voucher))
        .route("/vouchers/:code", get(catalog::get_voucher))
        .route("/invoices", post(booking::create_invoice))
        .route("/invoices/:id", get(booking::get_invoice))
        .route("/invoices/:id/cancel", post(booking::cancel_invoice))
        .route("/transactions/:id", get(booking::get_transaction))
        .route("/payments/webhook", post(booking::payment_webhook))
        .route("/tickets/:id/check-in", post(tickets::check_in))
        .route("/tickets/:id/refund-requests", post(tickets::request_refund))
        .route("/refund-requests", get(tickets::list_refund_requests))
        .route("/refund-requests/:id/approve", post(tickets::approve_refund))
        .route("/refund-requests/:id/reject", post(tickets::reject_refund))
        .layer(TraceLayer::new_for_http())
        .layer(cors::create_cors_layer())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        errors::Result,
        payment_gateway::{MockPaymentGateway, SIGNATURE_HEADER, TEST_WEBHOOK_SECRET, sign_payload},
        test_utils::*,
    };
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn router(db: DatabaseConnection) -> Router {
        create_router(AppState {
            db,
            gateway: Arc::new(MockPaymentGateway::default()),
            config: Arc::new(AppConfig::default()),
        })
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        send(app, request).await
    }

    /// Posts a webhook body, signed when `secret` is given.
    async fn post_webhook(app: &Router, payload: &Value, secret: Option<&[u8]>) -> (StatusCode, Value) {
        let body = payload.to_string();
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/payments/webhook")
            .header("content-type", "application/json");
        if let Some(secret) = secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, body.as_bytes()));
        }
        send(app, request.body(Body::from(body)).unwrap()).await
    }

    async fn signed_webhook(app: &Router, payload: &Value) -> (StatusCode, Value) {
        post_webhook(app, payload, Some(TEST_WEBHOOK_SECRET.as_bytes())).await
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health_check() -> Result<()> {
        let app = router(setup_test_db().await?);
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "ok");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_get_film() -> Result<()> {
        let app = router(setup_test_db().await?);
        let (status, body) = call(
            &app,
            Method::POST,
            "/films",
            Some(json!({ "title": "Arrival", "duration_minutes": 116, "release_date": "2026-01-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/films/{id}/versions"),
            Some(json!({ "format": "IMAX", "language": "English" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["format"], "IMAX");

        let (status, body) = call(&app, Method::GET, &format!("/films/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["film"]["title"], "Arrival");
        assert_eq!(body["data"]["versions"].as_array().unwrap().len(), 1);

        let (status, body) = call(
            &app,
            Method::GET,
            &format!("/film-versions/{}/showtimes", body["data"]["versions"][0]["id"]),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].as_array().unwrap().is_empty());

        let (status, body) = call(&app, Method::GET, "/films/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_and_webhook_flow() -> Result<()> {
        let fixture = setup_showtime().await?;
        let app = router(fixture.db.clone());
        let showtime_id = fixture.showtime.id;

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/showtimes/{showtime_id}/holds"),
            Some(json!({ "customer_id": "bob", "showtime_seat_ids": [fixture.seat_ids[1]] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["status"], "held");

        let (status, body) = call(
            &app,
            Method::POST,
            "/invoices",
            Some(json!({
                "customer_id": "alice",
                "showtime_id": showtime_id,
                "showtime_seat_ids": [fixture.seat_ids[0], fixture.seat_ids[1]],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "SEAT_UNAVAILABLE");
        assert_eq!(body["error"]["details"]["showtime_seat_id"], fixture.seat_ids[1]);

        let (status, body) = call(
            &app,
            Method::POST,
            "/invoices",
            Some(json!({
                "customer_id": "alice",
                "showtime_id": showtime_id,
                "showtime_seat_ids": [fixture.seat_ids[0]],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let invoice_id = body["data"]["invoice"]["id"].as_i64().unwrap();
        let transaction_id = body["data"]["transaction"]["id"].as_i64().unwrap();
        let reference = body["data"]["transaction"]["reference"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["invoice"]["total"], 90_000);

        let webhook = json!({ "reference": reference, "status": "success", "amount": 90_000 });
        let (status, body) = signed_webhook(&app, &webhook).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Payment recorded");
        let (_, body) = signed_webhook(&app, &webhook).await;
        assert_eq!(body["message"], "Payment already recorded");

        let (_, body) = call(&app, Method::GET, &format!("/invoices/{invoice_id}"), None).await;
        assert_eq!(body["data"]["invoice"]["status"], "paid");
        let ticket_id = body["data"]["tickets"][0]["id"].as_i64().unwrap();

        let (_, body) = call(&app, Method::GET, &format!("/transactions/{transaction_id}"), None).await;
        assert_eq!(body["data"]["status"], "success");

        let (status, body) =
            call(&app, Method::POST, &format!("/tickets/{ticket_id}/check-in"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "used");

        let (status, _) = call(
            &app,
            Method::DELETE,
            &format!("/showtimes/{showtime_id}/holds?customer_id=bob"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn test_refund_routes() -> Result<()> {
        let fixture = setup_showtime().await?;
        let app = router(fixture.db.clone());
        let checkout = create_test_invoice(&fixture, &fixture.seat_ids[..1]).await?;
        let ticket_id = checkout.tickets[0].id;

        // unpaid invoices cannot be refunded
        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/tickets/{ticket_id}/refund-requests"),
            Some(json!({ "reason": "Sick" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = signed_webhook(
            &app,
            &json!({
                "reference": checkout.transaction.reference,
                "status": "success",
                "amount": checkout.transaction.amount,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/tickets/{ticket_id}/refund-requests"),
            Some(json!({ "reason": "Sick" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let request_id = body["data"]["id"].as_i64().unwrap();

        let (_, body) = call(&app, Method::GET, "/refund-requests?status=pending", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/refund-requests/{request_id}/reject"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "rejected");

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/refund-requests/{request_id}/approve"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
        Ok(())
    }

    #[tokio::test]
    async fn test_webhook_requires_provider_signature() -> Result<()> {
        let fixture = setup_showtime().await?;
        let app = router(fixture.db.clone());
        let checkout = create_test_invoice(&fixture, &fixture.seat_ids[..1]).await?;
        let webhook = json!({
            "reference": checkout.transaction.reference,
            "status": "success",
            "amount": checkout.transaction.amount,
        });

        let (status, body) = post_webhook(&app, &webhook, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, _) = post_webhook(&app, &webhook, Some(b"customer-guess".as_slice())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, body) = call(
            &app,
            Method::GET,
            &format!("/invoices/{}", checkout.invoice.id),
            None,
        )
        .await;
        assert_eq!(body["data"]["invoice"]["status"], "pending");
        assert_eq!(body["data"]["transaction"]["status"], "pending");

        let (status, body) = post_webhook(
            &app,
            &json!({ "reference": checkout.transaction.reference }),
            Some(TEST_WEBHOOK_SECRET.as_bytes()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_invoice_route() -> Result<()> {
        let fixture = setup_showtime().await?;
        let app = router(fixture.db.clone());
        let checkout = create_test_invoice(&fixture, &fixture.seat_ids[..1]).await?;

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/invoices/{}/cancel", checkout.invoice.id),
            Some(json!({ "customer_id": "alice" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "cancelled");

        let (_, body) = call(
            &app,
            Method::GET,
            &format!("/showtimes/{}/seats", fixture.showtime.id),
            None,
        )
        .await;
        assert_eq!(body["data"][0]["status"], "available");
        Ok(())
    }
}
