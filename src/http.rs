use std::net::SocketAddr;

use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::constants;
use crate::errors;
use crate::sink::SharedDocument;

const INDEX: &str = "<html>\
<head><title>BOINC Exporter</title></head>\
<body><h1>BOINC Exporter</h1><p><a href=\"/metrics\">Metrics</a></p></body>\
</html>";

pub fn router(document: SharedDocument) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/metrics", get(handle_metrics))
        .with_state(document)
}

async fn handle_index() -> Html<&'static str> {
    Html(INDEX)
}

async fn handle_metrics(State(document): State<SharedDocument>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, constants::METRICS_CONTENT_TYPE)],
        document.current().to_string(),
    )
}

/// Serves the current document until the listener fails.
pub async fn serve(addr: SocketAddr, document: SharedDocument) -> errors::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "serving metrics over http");
    axum::serve(listener, router(document)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::Sink;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn get_path(addr: SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let req = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        );
        stream.write_all(req.as_bytes()).await.unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_current_document() {
        let document = SharedDocument::new();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(document.clone());
        tokio::spawn(async move { axum::serve(listener, app).await });

        document
            .publish(Arc::from("boinc_client_jobs_success{project=\"X\"} 7\n"))
            .unwrap();

        let rsp = get_path(addr, "/metrics").await;
        assert!(rsp.starts_with("HTTP/1.1 200"), "{}", rsp);
        assert!(rsp.contains("text/plain; version=0.0.4"));
        assert!(rsp.ends_with("boinc_client_jobs_success{project=\"X\"} 7\n"));

        let rsp = get_path(addr, "/").await;
        assert!(rsp.contains("href=\"/metrics\""));
    }
}
