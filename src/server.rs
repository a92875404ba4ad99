//! # Server Configuration
//!
//! Router, shared state and process lifecycle for the functions service.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::handlers;
use crate::mail::{self, Mailer};
use crate::notifications::NotificationScheduler;
use crate::storage::{self, ObjectStore};
use crate::telemetry::{TRACE_ID_HEADER, TraceContext, with_trace_context};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub scheduler: Arc<NotificationScheduler>,
    pub store: Arc<dyn ObjectStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Builds the storage and mail backends selected by `config`.
    pub fn from_config(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<Self> {
        let store = storage::from_config(&config.storage)?;
        let mailer = mail::from_config(&config.smtp)?;
        let scheduler = Arc::new(NotificationScheduler::new(
            Arc::new(db.clone()),
            config.scheduler.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            scheduler,
            store,
            mailer,
        })
    }
}

/// Attaches a [`TraceContext`] to the request and echoes its ID on the response.
async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    let context = TraceContext::from_headers(request.headers());
    let trace_id = context.trace_id.clone();
    request.extensions_mut().insert(context.clone());

    let mut response = with_trace_context(context, next.run(request)).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let operator_routes = Router::new()
        .route(
            "/functions/notification-scheduler",
            post(handlers::scheduler::run_scheduler),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route(
            "/functions/template-fill",
            post(handlers::templates::template_fill),
        )
        .route("/functions/signer-otp", post(handlers::otp::signer_otp))
        .merge(operator_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_context_middleware))
}

/// Starts the server with the given configuration
///
/// When the scheduler loop is enabled it runs beside the server and both stop
/// on Ctrl-C.
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();
    let scheduler_enabled = config.scheduler.enabled;

    let state = AppState::from_config(config, db)?;
    let shutdown = CancellationToken::new();

    let scheduler_task = scheduler_enabled.then(|| {
        let scheduler = Arc::clone(&state.scheduler);
        tokio::spawn(scheduler.run(shutdown.child_token()))
    });

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, scheduler_enabled, "Server listening");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(task) = scheduler_task
        && let Err(err) = task.await
    {
        tracing::error!(error = %err, "Scheduler loop terminated abnormally");
    }

    Ok(())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
        crate::handlers::scheduler::run_scheduler,
        crate::handlers::templates::template_fill,
        crate::handlers::otp::signer_otp,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::error::FunctionErrorBody,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "LexCRM Functions API",
        description = "Notification scheduler, document template fill and signer verification codes",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
