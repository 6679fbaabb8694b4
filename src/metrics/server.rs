use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

use super::Metrics;
use crate::messaging::RedpandaClient;
use crate::utils::CircuitState;

struct ServerState {
    metrics: Arc<Metrics>,
    redpanda: Arc<RedpandaClient>,
}

/// Serve `/metrics` and `/health` until the server is stopped.
pub async fn start_metrics_server(
    metrics: Arc<Metrics>,
    redpanda: Arc<RedpandaClient>,
    port: u16,
) -> std::io::Result<()> {
    tracing::info!("📊 Starting metrics server on http://0.0.0.0:{}/metrics", port);

    let state = web::Data::new(ServerState { metrics, redpanda });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/metrics", web::get().to(metrics_handler))
            .route("/health", web::get().to(health_handler))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

async fn metrics_handler(state: web::Data<ServerState>) -> impl Responder {
    let circuit = state.redpanda.circuit_state().await;
    state.metrics.update_circuit_breaker_state(circuit.as_gauge());

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    match encoder.encode(&state.metrics.registry().gather(), &mut buffer) {
        Ok(()) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(buffer),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn health_handler(state: web::Data<ServerState>) -> impl Responder {
    let circuit = state.redpanda.circuit_state().await;
    state.metrics.update_circuit_breaker_state(circuit.as_gauge());

    let (status, body_status) = match circuit {
        CircuitState::Closed => (actix_web::http::StatusCode::OK, "healthy"),
        CircuitState::HalfOpen => (actix_web::http::StatusCode::OK, "degraded"),
        CircuitState::Open => (actix_web::http::StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };

    HttpResponse::build(status).json(serde_json::json!({
        "status": body_status,
        "service": "orders-ms",
        "bus_circuit": format!("{:?}", circuit),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use std::time::Duration;

    #[actix_web::test]
    async fn test_scrape_reports_current_breaker_state() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let redpanda = Arc::new(
            RedpandaClient::new("127.0.0.1:1", Duration::from_millis(100), metrics.clone()).unwrap(),
        );
        // Stale value left over from an earlier transition.
        metrics.update_circuit_breaker_state(CircuitState::Open.as_gauge());

        let state = web::Data::new(ServerState { metrics, redpanda });
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route("/metrics", web::get().to(metrics_handler)),
        )
        .await;

        let response =
            test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
        assert!(response.status().is_success());

        let body = test::read_body(response).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("circuit_breaker_state 0"));
    }
}
