use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::Result;
use axum::http::StatusCode;
use axum::{response::IntoResponse, routing::get, Json, Router};
use comics_app::auth::{AllowAll, Authorizer, StaticTokens, TokenLayer};
use comics_app::state::{AppConfig, AppState};
use futures::FutureExt;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(state);

    if args.cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

#[cfg(feature = "openapi")]
fn api_docs() -> utoipa::openapi::OpenApi {
    #[derive(utoipa::OpenApi)]
    #[openapi(modifiers(&SecurityAddon), security(("bearer" = [])))]
    struct OpenApi;

    struct SecurityAddon;

    impl utoipa::Modify for SecurityAddon {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

            openapi
                .components
                .get_or_insert_with(utoipa::openapi::Components::new)
                .add_security_scheme(
                    "bearer",
                    SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
                );
        }
    }

    use utoipa::OpenApi as _;
    OpenApi::openapi().nest("/v1/comics", comics_app::rest_api::comic::api_docs())
}

pub fn main_router(state: AppState) -> Router<()> {
    #[allow(unused_mut)]
    let mut router = Router::new()
        .nest("/v1/comics", comics_app::rest_api::comic::router())
        // All above routes are protected
        .layer(TokenLayer::new(state.authorizer()))
        .with_state(state)
        .route("/v1/healthcheck", get(health));

    #[cfg(feature = "openapi")]
    {
        let docs = api_docs();
        router = router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs),
        );
    }
    router.layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "available",
            "system_info": {
                "version": env!("CARGO_PKG_VERSION"),
            }
        })),
    )
}

fn build_authorizer(config: &ServerConfig) -> Result<Arc<dyn Authorizer>> {
    let tokens = StaticTokens::parse(&config.api_tokens)?;
    if tokens.is_empty() {
        warn!("No API tokens configured, all requests are allowed");
        Ok(Arc::new(AllowAll))
    } else {
        debug!("Using {} configured API tokens", config.api_tokens.len());
        Ok(Arc::new(tokens))
    }
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let data_dir = config.data_dir();
    if !data_dir.is_dir() {
        tokio::fs::create_dir_all(&data_dir).await?;
        info!("Created data directory {}", data_dir.display());
    }

    let pool = comics_dal::new_pool(&config.database_url()).await?;
    comics_dal::migrate(&pool).await?;

    let app_config = AppConfig {
        default_page_size: config.default_page_size,
        store_timeout: config.store_timeout,
    };
    let authorizer = build_authorizer(config)?;
    Ok(AppState::new(app_config, pool, authorizer))
}
