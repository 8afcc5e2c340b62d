use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Request, Response},
    middleware,
    routing::{delete, get, post, put},
};
use medrec_db::create_backend;
use medrec_storage::PatientStore;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::{config::AppConfig, handlers, middleware as app_middleware};

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Arc<PatientStore>,
}

impl AppState {
    pub fn new(store: PatientStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Store backed by whatever `storage` in the config selects.
    pub fn from_config(cfg: &AppConfig) -> Self {
        let backend = create_backend(&cfg.storage.backend_config());
        tracing::info!(
            backend = backend.backend_name(),
            path = %cfg.storage.path.display(),
            "Patient store ready"
        );
        Self::new(PatientStore::new(backend))
    }
}

pub struct MedrecServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(cfg: &AppConfig) -> Router {
    build_router(AppState::from_config(cfg), cfg)
}

pub fn build_router(state: AppState, cfg: &AppConfig) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/about", get(handlers::about))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/view", get(handlers::view))
        .route("/patient/{id}", get(handlers::get_patient))
        .route("/sort", get(handlers::sort_patients))
        .route("/create", post(handlers::create_patient))
        .route("/edit/{id}", put(handlers::edit_patient))
        .route("/delete/{id}", delete(handlers::delete_patient))
        .with_state(state)
        // Outermost first: request id -> trace -> cors/compression -> timeout -> content negotiation
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(app_middleware::request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &Request<_>| {
                            let req_id = req
                                .extensions()
                                .get::<app_middleware::RequestId>()
                                .and_then(|id| id.0.to_str().ok())
                                .unwrap_or("")
                                .to_string();
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri(),
                                http.status_code = tracing::field::Empty,
                                request_id = %req_id
                            )
                        })
                        .on_response(
                            |res: &Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(cfg.request_timeout()))
                .layer(middleware::from_fn(app_middleware::content_negotiation))
                .layer(DefaultBodyLimit::max(cfg.server.body_limit_bytes)),
        )
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    state: Option<AppState>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            state: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Use an existing store instead of building one from the config.
    pub fn with_state(mut self, state: AppState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn build(self) -> MedrecServer {
        let state = self
            .state
            .unwrap_or_else(|| AppState::from_config(&self.config));
        let app = build_router(state, &self.config);

        MedrecServer {
            addr: self.addr,
            app,
        }
    }
}

impl MedrecServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", listener.local_addr()?);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
