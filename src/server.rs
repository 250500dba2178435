//! HTTP endpoint serving the current blocklist.
//!
//! One resource lives at `/`:
//!
//! - `GET /` returns the payload with its metadata headers and is
//!   access-logged.
//! - `HEAD /` returns the same headers without a body. It is meant for
//!   health checks and is neither logged nor counted.
//!
//! Every other path is a 404.

use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::net::TcpListener;

use crate::fetcher::SourceFetcher;
use crate::refresh::Refresher;
use crate::snapshot::Snapshot;
use crate::state::SharedBlocklist;
use crate::{Error, Result};

/// Request counters for the full-download audit trail.
#[derive(Debug, Default)]
pub struct ServerStats {
    served: AtomicU64,
}

impl ServerStats {
    /// Number of completed `GET /` responses.
    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }
}

#[derive(Clone)]
struct AppState {
    blocklist: SharedBlocklist,
    stats: Arc<ServerStats>,
}

/// Build the router for the blocklist endpoint.
pub fn router(blocklist: SharedBlocklist, stats: Arc<ServerStats>) -> Router {
    Router::new()
        .route("/", get(full_request).head(metadata_request))
        .with_state(AppState { blocklist, stats })
}

/// Response headers, all taken from one snapshot.
fn snapshot_headers(snapshot: &Snapshot, now: SystemTime) -> [(HeaderName, String); 6] {
    let blocklist = snapshot.blocklist();
    [
        (header::CONTENT_TYPE, snapshot.content_type().to_string()),
        (header::CONTENT_DISPOSITION, snapshot.content_disposition()),
        (header::LAST_MODIFIED, snapshot.last_modified()),
        (header::CACHE_CONTROL, snapshot.cache_control_at(now)),
        (header::CONTENT_LENGTH, blocklist.len().to_string()),
        (header::ETAG, blocklist.validator().to_string()),
    ]
}

async fn full_request(
    State(app): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    let snapshot = app.blocklist.get();
    let body = snapshot.blocklist().content().clone();

    app.stats.served.fetch_add(1, Ordering::Relaxed);
    log::info!("{} \"GET /\" 200 {}", peer, body.len());

    (
        StatusCode::OK,
        snapshot_headers(&snapshot, SystemTime::now()),
        body,
    )
        .into_response()
}

async fn metadata_request(State(app): State<AppState>) -> Response {
    let snapshot = app.blocklist.get();
    (StatusCode::OK, snapshot_headers(&snapshot, SystemTime::now())).into_response()
}

/// Bind the listening socket.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Serve `state` on `listener` while `refresher` keeps it up to date.
///
/// Returns only when one side stops. A failed rebuild is returned as the
/// error and the server is dropped with it.
pub async fn run<F: SourceFetcher + 'static>(
    listener: TcpListener,
    state: SharedBlocklist,
    refresher: Refresher<F>,
) -> Result<()> {
    let app = router(state.clone(), Arc::new(ServerStats::default()))
        .into_make_service_with_connect_info::<SocketAddr>();
    let server = axum::serve(listener, app).into_future();

    tokio::select! {
        result = refresher.run(state) => match result {
            Ok(never) => match never {},
            Err(e) => {
                log::error!("Blocklist update failed: {}", e);
                Err(e)
            }
        },
        result = server => result.map_err(Error::from),
    }
}

/// Serve mode: build once, bind, then serve and refresh forever.
///
/// The first build happens before binding, so a broken source never leaves
/// a listener up with nothing to serve.
pub async fn serve<F: SourceFetcher + 'static>(
    addr: SocketAddr,
    refresher: Refresher<F>,
) -> Result<()> {
    let initial = refresher.clone();
    let state = tokio::task::spawn_blocking(move || initial.initial())
        .await
        .map_err(|e| Error::Task(e.to_string()))??;

    let listener = bind(addr).await?;
    run(listener, state, refresher).await
}
