//! WebSocket surface of the relay.
//!
//! One socket per (client, channel). Text frames are JSON payloads; the
//! relay does not inspect them beyond parsing — envelope semantics live
//! entirely in the clients.

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};

use crate::hub::ChannelHub;

/// Builds the relay router.
pub fn router(hub: Arc<ChannelHub>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/channels/{name}/ws", get(channel_ws))
        .with_state(hub)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn channel_ws(
    upgrade: WebSocketUpgrade,
    Path(name): Path<String>,
    State(hub): State<Arc<ChannelHub>>,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| relay_connection(socket, name, hub))
}

async fn relay_connection(socket: WebSocket, channel: String, hub: Arc<ChannelHub>) {
    tracing::info!(%channel, "subscriber connected");
    let mut feed = hub.subscribe(&channel);
    let (mut sink, mut stream) = socket.split();

    let outbound_channel = channel.clone();
    let mut outbound = tokio::spawn(async move {
        loop {
            match feed.recv().await {
                Ok(payload) => {
                    let Ok(text) = serde_json::to_string(&payload) else {
                        continue;
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(channel = %outbound_channel, skipped, "socket lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let inbound_hub = Arc::clone(&hub);
    let inbound_channel = channel.clone();
    let mut inbound = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            if let Message::Text(text) = message {
                match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(payload) => inbound_hub.publish(&inbound_channel, payload),
                    Err(err) => {
                        tracing::debug!(error = %err, "dropping non-JSON frame");
                    }
                }
            }
        }
    });

    // Either direction closing tears the connection down.
    tokio::select! {
        _ = &mut outbound => inbound.abort(),
        _ = &mut inbound => outbound.abort(),
    }
    tracing::info!(%channel, "subscriber disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_healthz_responds_ok() {
        let app = router(Arc::new(ChannelHub::new()));

        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_channel_route_requires_upgrade() {
        let app = router(Arc::new(ChannelHub::new()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/channels/session:x/ws")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        // A plain GET without the upgrade handshake is rejected.
        assert_ne!(response.status(), StatusCode::OK);
    }
}
