use crate::metrics::REGISTRY;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::method_routing;
use axum::Router;
use axum_server::Server;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use tracing::error;

fn encode(families: &[MetricFamily]) -> String {
    let mut buffer = Vec::new();
    if let Err(err) = TextEncoder::new().encode(families, &mut buffer) {
        error!(msg = "Could not encode metrics", ?err);
    }
    String::from_utf8(buffer).unwrap_or_else(|err| {
        error!(msg = "Metrics are not valid utf8", ?err);
        String::default()
    })
}

async fn prometheus_metrics() -> impl IntoResponse {
    let mut body = encode(&REGISTRY.gather());
    body.push_str(&encode(&prometheus::gather()));

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        body,
    )
}

pub struct Prometheus {
    server: Server,
}

impl Prometheus {
    pub fn new(addr: SocketAddr) -> Self {
        let server = axum_server::bind(addr);

        Self { server }
    }

    pub async fn serve(self) -> std::io::Result<()> {
        let router = Router::new()
            .route("/metrics", method_routing::get(prometheus_metrics))
            .into_make_service();
        self.server.serve(router).await
    }
}

#[cfg(test)]
mod tests {
    use super::encode;
    use crate::metrics::{ALLOWED_RELAYS, REGISTRY};

    #[test]
    fn encodes_registered_metrics() {
        let _ = ALLOWED_RELAYS.get();
        let body = encode(&REGISTRY.gather());
        assert!(body.contains("# TYPE relay_ip_checker_allowed_relays gauge"));
    }
}
