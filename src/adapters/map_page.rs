//! Generated Google Maps page and the local server the headless browser loads it from.

use crate::adapters::geocode::Coordinates;
use crate::utils::error::{AgentError, Result};
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Full-viewport map centered on `coords` with a single marker.
pub fn generate_map_html(coords: Coordinates, api_key: &str, zoom: u8) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>Map Screenshot</title>
    <style>
      html, body, #map {{
        margin: 0;
        padding: 0;
        height: 100%;
        width: 100%;
      }}
    </style>
    <script src="https://maps.googleapis.com/maps/api/js?key={api_key}"></script>
    <script>
      function initMap() {{
        const center = {{ lat: {lat}, lng: {lng} }};
        const map = new google.maps.Map(document.getElementById("map"), {{
          zoom: {zoom},
          center: center,
          disableDefaultUI: true
        }});
        new google.maps.Marker({{
          position: center,
          map: map
        }});
      }}
      window.onload = initMap;
    </script>
  </head>
  <body>
    <div id="map"></div>
  </body>
</html>
"#,
        api_key = api_key,
        lat = coords.lat,
        lng = coords.lng,
        zoom = zoom,
    )
}

async fn serve_page(State(page): State<Arc<String>>) -> Html<String> {
    Html(page.as_ref().clone())
}

/// Serves one HTML page on every path until shut down.
pub struct MapPageServer {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl MapPageServer {
    pub async fn start(bind_addr: &str, html: String) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(bind_addr)
            .await
            .map_err(|e| AgentError::ServerError {
                message: format!("failed to bind {}: {}", bind_addr, e),
            })?;
        let local_addr = listener.local_addr()?;

        let router = Router::new()
            .route("/", get(serve_page))
            .fallback(serve_page)
            .with_state(Arc::new(html));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!("🗺️ Serving map at http://{}", local_addr);

        Ok(Self {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        match self.handle.await {
            Ok(result) => result.map_err(AgentError::IoError),
            Err(e) => Err(AgentError::ServerError {
                message: format!("server task failed: {}", e),
            }),
        }?;

        tracing::debug!("Map server on {} stopped", self.local_addr);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_page_contains_marker_and_key() {
        let html = generate_map_html(
            Coordinates {
                lat: 37.7799,
                lng: -122.4537,
            },
            "maps-key",
            13,
        );

        assert!(html.contains("maps/api/js?key=maps-key"));
        assert!(html.contains("lat: 37.7799, lng: -122.4537"));
        assert!(html.contains("zoom: 13"));
        assert!(html.contains("new google.maps.Marker"));
        assert!(html.contains("disableDefaultUI: true"));
        assert!(html.contains("height: 100%;"));
    }

    #[tokio::test]
    async fn test_server_serves_page_on_any_path() {
        let server = MapPageServer::start("127.0.0.1:0", "<p>map</p>".to_string())
            .await
            .unwrap();

        let root = reqwest::get(server.url()).await.unwrap();
        assert!(root.status().is_success());
        assert!(root
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .starts_with("text/html"));
        assert_eq!(root.text().await.unwrap(), "<p>map</p>");

        let other = reqwest::get(format!("{}/favicon.ico", server.url()))
            .await
            .unwrap();
        assert_eq!(other.text().await.unwrap(), "<p>map</p>");

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_is_server_error() {
        let first = MapPageServer::start("127.0.0.1:0", String::new()).await.unwrap();
        let taken = first.local_addr().to_string();

        let second = MapPageServer::start(&taken, String::new()).await;
        assert!(matches!(second, Err(AgentError::ServerError { .. })));

        first.shutdown().await.unwrap();
    }
}
