use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Router, Server, TypedHeader};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::{info, warn};
use crate::config::TrackingConfig;
use crate::handlers::websocket_actor::run_connection;
use crate::storage::kv::SharedStore;

#[derive(Clone)]
pub struct AppState {
    pub tracking: Arc<TrackingConfig>,
    pub store: SharedStore,
    pub sessions: Arc<Semaphore>,
}

impl AppState {
    pub fn new(tracking: TrackingConfig, store: SharedStore, max_sessions: usize) -> Self {
        Self {
            tracking: Arc::new(tracking),
            store,
            sessions: Arc::new(Semaphore::new(max_sessions)),
        }
    }
}

#[derive(Deserialize)]
struct SessionParams {
    #[serde(default = "geolocation_by_default")]
    geolocation: bool,
}

fn geolocation_by_default() -> bool {
    true
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws/session", get(session_ws_handler))
        // logging so we can see whats going on
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("listening on {}", listener.local_addr()?);
    Server::from_tcp(listener)?
        .serve(router(state).into_make_service_with_connect_info::<SocketAddr>())
        .await?;
    Ok(())
}

async fn session_ws_handler(
    ws: WebSocketUpgrade,
    user_agent: Option<TypedHeader<headers::UserAgent>>,
    Query(params): Query<SessionParams>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    let permit = match state.sessions.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            warn!("Refusing session from {}: session limit reached", addr);
            return (StatusCode::SERVICE_UNAVAILABLE, "too many sessions").into_response();
        }
    };
    let agent = user_agent.map(|TypedHeader(agent)| agent.as_str().to_string()).unwrap_or_default();
    info!("Session from {} ({}), geolocation={}", addr, agent, params.geolocation);

    ws.on_upgrade(move |socket| async move {
        run_connection(socket, state.tracking.as_ref().clone(), state.store.clone(), params.geolocation).await;
        drop(permit);
        info!("Session from {} finished", addr);
    })
}
