//! Inbound webhook transport.
//!
//! One POST route that decodes the gateway's JSON and hands it to the
//! pipeline. Handled payloads always answer 200 — a malformed-but-decodable
//! delivery is the pipeline's business (and maps to a no-op), only an
//! undecodable body is rejected at the transport layer.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Json;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::ingest::Pipeline;
use crate::model::Outcome;

#[derive(Clone)]
pub struct WebhookState {
    pipeline: Arc<Pipeline>,
}

pub fn router(path: &str, pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route(path, post(webhook_handler))
        .with_state(WebhookState { pipeline })
}

async fn webhook_handler(
    State(state): State<WebhookState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    match state.pipeline.process(&body).await {
        Outcome::Created {
            conversation_id,
            message_ids,
        } => {
            info!(
                "webhook: created {} message(s) in conversation {}",
                message_ids.len(),
                conversation_id
            );
        }
        Outcome::StatusesApplied { applied, total } => {
            info!("webhook: applied {}/{} status updates", applied, total);
        }
        Outcome::Skipped => {
            debug!("webhook: delivery skipped");
        }
    }
    StatusCode::OK
}

pub async fn serve(port: u16, path: &str, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let app = router(path, pipeline);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("webhook server listening on 0.0.0.0:{}{}", port, path);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("webhook: failed to install signal handler: {}", e);
            }
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;
    use crate::identity::{AvatarSource, IdentityResolver};
    use crate::store::memory::{InMemoryStore, LoggingDispatcher};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct NoAvatar;

    #[async_trait]
    impl AvatarSource for NoAvatar {
        async fn avatar_url(&self, _identifier: &str) -> anyhow::Result<Option<String>> {
            Ok(None)
        }
    }

    fn test_router() -> (Arc<InMemoryStore>, Router) {
        let store = Arc::new(InMemoryStore::new());
        let channel = ChannelConfig {
            phone_number: "5559999".into(),
            channel_id: "whatsapp-web".into(),
        };
        let resolver = IdentityResolver::new(
            store.clone(),
            store.clone(),
            Arc::new(LoggingDispatcher),
            Arc::new(NoAvatar),
            channel.clone(),
        );
        let pipeline = Arc::new(Pipeline::new(resolver, store.clone(), channel));
        (store.clone(), router("/webhooks/whatsapp", pipeline))
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhooks/whatsapp")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn delivery_lands_as_message() {
        let (store, app) = test_router();
        let response = app
            .oneshot(post_json(
                r#"{"event":"message","from":"5551234@s.whatsapp.net","message":{"id":"abc","text":"hi"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.message_count(), 1);
    }

    #[tokio::test]
    async fn skipped_delivery_still_answers_ok() {
        let (store, app) = test_router();
        let response = app
            .oneshot(post_json(r#"{"event":"group.participants"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.message_count(), 0);
    }

    #[tokio::test]
    async fn undecodable_body_is_rejected_at_transport() {
        let (_, app) = test_router();
        let response = app.oneshot(post_json("this is not json")).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
