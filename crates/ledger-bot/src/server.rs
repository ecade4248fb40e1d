use crate::config::BotServerConfig;
use crate::dispatcher::Dispatcher;
use crate::types::Update;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    token: Arc<str>,
}

/// Receives Bot API updates pushed to `/webhook/<token>`
pub struct WebhookServer {
    config: BotServerConfig,
    state: AppState,
}

impl WebhookServer {
    pub fn new(config: BotServerConfig, dispatcher: Arc<Dispatcher>, bot_token: &str) -> Self {
        Self {
            config,
            state: AppState {
                dispatcher,
                token: Arc::from(bot_token),
            },
        }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/health", get(health_check))
            .route("/webhook/:token", post(webhook))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> crate::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.address();
        let app = self.router();

        info!(address = %addr, "Starting webhook server");

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::BotError::Server(e.to_string()))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| crate::BotError::Server(e.to_string()))?;

        info!("Webhook server stopped");
        Ok(())
    }
}

async fn index() -> impl IntoResponse {
    "BNB Earner Bot is live!"
}

async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Always answers 200 once the token matches, otherwise the Bot API keeps
/// redelivering an update that failed on our side.
async fn webhook(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: Bytes,
) -> StatusCode {
    if token.as_str() != &*state.token {
        warn!("Webhook called with an unknown token");
        return StatusCode::NOT_FOUND;
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, "Discarding malformed update");
            return StatusCode::OK;
        }
    };

    let update_id = update.update_id;
    if let Err(e) = state.dispatcher.handle(update).await {
        warn!(update_id, error = %e, "Update handling failed");
    }
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeChat;
    use crate::notifier::{ChannelMembership, TelegramNotifier};
    use ledger_core::AppConfig;
    use ledger_engine::{Engine, SystemClock};
    use ledger_store::MemoryStore;

    fn state(chat: Arc<FakeChat>) -> AppState {
        let config = AppConfig::load_from(|key| match key {
            "BOT_TOKEN" => Some("42:secret".to_string()),
            "ADMIN_ID" => Some("1".to_string()),
            "CHANNEL_USERNAME" => Some("earners".to_string()),
            "BOT_MESSAGE_TTL" => Some("0".to_string()),
            _ => None,
        })
        .unwrap();
        let engine = Engine::new(
            &config,
            Arc::new(MemoryStore::new()),
            Arc::new(TelegramNotifier::new(chat.clone())),
            Arc::new(SystemClock),
        );
        let dispatcher = Dispatcher::new(
            Arc::new(engine),
            chat.clone(),
            Arc::new(ChannelMembership::new(chat, "earners")),
            config.telegram.clone(),
        );
        AppState {
            dispatcher: Arc::new(dispatcher),
            token: Arc::from(config.telegram.bot_token.as_str()),
        }
    }

    fn start_update(from: i64) -> Bytes {
        Bytes::from(
            serde_json::json!({
                "update_id": 5,
                "message": {
                    "message_id": 1,
                    "from": {"id": from, "is_bot": false, "first_name": "Ann"},
                    "chat": {"id": from, "type": "private"},
                    "date": 0,
                    "text": "/start"
                }
            })
            .to_string(),
        )
    }

    #[tokio::test]
    async fn test_wrong_token_is_not_found() {
        let chat = Arc::new(FakeChat::default());
        let status = webhook(
            State(state(chat.clone())),
            Path("other".to_string()),
            start_update(7),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(chat.events().is_empty());
    }

    #[tokio::test]
    async fn test_update_is_dispatched() {
        let chat = Arc::new(FakeChat::default());
        let status = webhook(
            State(state(chat.clone())),
            Path("42:secret".to_string()),
            start_update(7),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(chat.last_sent(7).unwrap().text.starts_with("👋 Welcome"));
    }

    #[tokio::test]
    async fn test_failures_still_acknowledge() {
        let chat = Arc::new(FakeChat::default());
        let state = state(chat.clone());

        let malformed = webhook(
            State(state.clone()),
            Path("42:secret".to_string()),
            Bytes::from_static(b"{not json"),
        )
        .await;
        assert_eq!(malformed, StatusCode::OK);

        chat.fail_sends();
        let failed = webhook(State(state), Path("42:secret".to_string()), start_update(7)).await;
        assert_eq!(failed, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_static_routes() {
        let body = index().await.into_response();
        assert_eq!(body.status(), StatusCode::OK);
        let health = health_check().await.into_response();
        assert_eq!(health.status(), StatusCode::OK);
    }
}
