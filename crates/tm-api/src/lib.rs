use std::env;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};
use axum::http::{Method, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use clap::Parser;
use dotenvy::dotenv;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};
use tm_common::db::{PgPool, create_pool_from_url, run_migrations};
use tm_common::matching::RankConfig;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod auth;
pub mod error;
pub mod handlers;

use auth::AuthConfig;
use error::ApiError;
use handlers::{assignments, candidates, developers, health};
use tm_common::logging::{init_tracing_subscriber, install_tracing_panic_hook};

const DRAIN_GRACE: std::time::Duration = std::time::Duration::from_millis(200);

/// Request bodies past this size are rejected before reaching a handler.
const MAX_BODY_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone, Parser)]
#[command(name = "tm-api", about = "HTTP API for the talent-matcher staffing workflow")]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Server port
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// HS256 secret for bearer-token validation
    #[arg(long, env = "TM_JWT_SECRET")]
    jwt_secret: String,

    /// Comma separated list of allowed CORS origins
    #[arg(long, env = "TM_CORS_ORIGINS", default_value = "http://localhost:3000")]
    cors_origins: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub auth: AuthConfig,
}

impl AppConfig {
    fn from_cli(cli: Cli) -> Result<Self, ApiError> {
        let cors_origins: Vec<String> = cli
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect();

        if cors_origins.iter().any(|origin| origin == "*") {
            return Err(ApiError::BadRequest(
                "TM_CORS_ORIGINS must list explicit origins when credentials are enabled".into(),
            ));
        }

        if cli.jwt_secret.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "TM_JWT_SECRET must not be empty".into(),
            ));
        }

        Ok(Self {
            database_url: cli.database_url,
            port: cli.port,
            cors_origins,
            auth: AuthConfig {
                jwt_secret: cli.jwt_secret,
            },
        })
    }

    pub fn for_tests(auth: AuthConfig) -> Self {
        Self {
            database_url: "postgres://tm:tm@localhost:5432/talent_matcher".into(),
            port: 3001,
            cors_origins: vec!["http://localhost:3000".into()],
            auth,
        }
    }
}

type IpRateLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock, NoOpMiddleware>;

#[derive(Clone)]
pub struct RateLimits {
    global: Arc<IpRateLimiter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_sec: u32,
    pub burst: u32,
}

impl RateLimitConfig {
    fn parse_env(name: &str) -> Option<u32> {
        env::var(name)
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|value| *value > 0)
    }

    fn from_env() -> Self {
        Self {
            per_sec: Self::parse_env("TM_RATE_LIMIT_RPS").unwrap_or(20),
            burst: Self::parse_env("TM_RATE_LIMIT_BURST").unwrap_or(40),
        }
    }
}

fn build_ip_limiter(cfg: &RateLimitConfig) -> Arc<IpRateLimiter> {
    let per_second = NonZeroU32::new(cfg.per_sec).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(cfg.burst).unwrap_or(NonZeroU32::MIN);

    Arc::new(RateLimiter::keyed(
        Quota::per_second(per_second).allow_burst(burst),
    ))
}

pub fn rate_limits_from_env() -> RateLimits {
    RateLimits {
        global: build_ip_limiter(&RateLimitConfig::from_env()),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
    pub rank: RankConfig,
    pub(crate) rate_limits: RateLimits,
    pub readiness: Arc<AtomicBool>,
}

pub type SharedState = Arc<AppState>;

impl axum::extract::FromRef<SharedState> for AuthConfig {
    fn from_ref(input: &SharedState) -> AuthConfig {
        input.config.auth.clone()
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let mut allowed = Vec::with_capacity(origins.len());
    for origin in origins {
        if let Ok(value) = origin.parse::<HeaderValue>() {
            allowed.push(value);
        }
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

fn client_ip(req: &Request<Body>) -> Option<IpAddr> {
    let info = req.extensions().get::<ConnectInfo<SocketAddr>>()?;
    Some(info.0.ip())
}

/// Per-IP token bucket over the whole surface. Requests without a peer
/// address (router unit tests) pass through unchecked.
async fn global_rate_limit(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(ip) = client_ip(&req) {
        if state.rate_limits.global.check_key(&ip).is_err() {
            return Err(ApiError::TooManyRequests("rate limit exceeded".into()));
        }
    }
    Ok(next.run(req).await)
}

/// Binds the request id (set by the layers above) to the task, so error
/// bodies produced anywhere below can echo it.
async fn attach_request_id_context(req: Request<Body>, next: Next) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    error::with_request_id(request_id, next.run(req)).await
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        %request_id,
    )
}

pub fn create_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let request_id_header = HeaderName::from_static("x-request-id");

    let api_routes = Router::new()
        .route("/assignments", post(assignments::create_assignment))
        .route("/assignments/pending", get(assignments::list_pending))
        .route(
            "/assignments/:assignment_id/approve",
            post(assignments::approve),
        )
        .route(
            "/assignments/:assignment_id/reject",
            post(assignments::reject),
        )
        .route(
            "/projects/:project_id/candidates",
            get(candidates::list_candidates),
        )
        .route("/developers/eligible", get(developers::list_eligible))
        .route(
            "/developers/:developer_id/history",
            get(developers::role_history),
        );

    // Outermost layers run first: assign the request id, propagate it back
    // on the response, then trace, cap body size, and rate limit.
    Router::new()
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(state.clone(), global_rate_limit))
        .layer(middleware::from_fn(attach_request_id_context))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid::default()))
        .layer(cors)
        .with_state(state)
}

pub fn test_state(jwt_secret: &str) -> SharedState {
    let pool = create_pool_from_url("postgres://tm:tm@localhost:5432/talent_matcher")
        .expect("pool construction does not contact the database");

    let auth = AuthConfig {
        jwt_secret: jwt_secret.to_string(),
    };

    Arc::new(AppState {
        pool,
        config: AppConfig::for_tests(auth),
        rank: RankConfig::default(),
        rate_limits: rate_limits_from_env(),
        readiness: Arc::new(AtomicBool::new(true)),
    })
}

pub async fn run() -> Result<(), ApiError> {
    dotenv().ok();
    init_tracing_subscriber(env!("CARGO_PKG_NAME"));
    install_tracing_panic_hook(env!("CARGO_PKG_NAME"));

    let config = AppConfig::from_cli(Cli::parse())?;
    let pool = create_pool_from_url(&config.database_url)
        .map_err(|err| ApiError::Database(format!("failed to create pool: {err}")))?;
    run_migrations(&pool)
        .await
        .map_err(|err| ApiError::Database(format!("failed to run migrations: {err}")))?;

    let state = Arc::new(AppState {
        pool,
        rank: RankConfig::from_env(),
        rate_limits: rate_limits_from_env(),
        readiness: Arc::new(AtomicBool::new(true)),
        config: config.clone(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = create_router(state.clone());

    info!(%addr, "tm-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(state))
    .await
    .map_err(|err| ApiError::Internal(err.to_string()))
}

async fn shutdown_signal(state: SharedState) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                let _ = sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    // Flip /readyz to not-ready and let load balancers notice before the
    // listener stops accepting connections.
    state.readiness.store(false, Ordering::SeqCst);
    tokio::time::sleep(DRAIN_GRACE).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use std::sync::Mutex;
    use tower::ServiceExt;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env_vars(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
        let _guard = ENV_LOCK.lock().unwrap();

        let saved: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(name, _)| ((*name).to_string(), env::var(name).ok()))
            .collect();

        for (name, value) in vars {
            match value {
                Some(v) => unsafe { env::set_var(name, v) },
                None => unsafe { env::remove_var(name) },
            }
        }

        f();

        for (name, value) in saved {
            match value {
                Some(v) => unsafe { env::set_var(&name, v) },
                None => unsafe { env::remove_var(&name) },
            }
        }
    }

    fn cli(jwt_secret: &str, cors_origins: &str) -> Cli {
        Cli {
            database_url: "postgres://tm:tm@localhost:5432/talent_matcher".into(),
            port: 3001,
            jwt_secret: jwt_secret.into(),
            cors_origins: cors_origins.into(),
        }
    }

    #[tokio::test]
    async fn responses_carry_a_generated_request_id() {
        let app = create_router(test_state("test-secret"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/livez")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[test]
    fn rate_limit_config_respects_env_overrides() {
        with_env_vars(
            &[
                ("TM_RATE_LIMIT_RPS", Some("10")),
                ("TM_RATE_LIMIT_BURST", Some("25")),
            ],
            || {
                let cfg = RateLimitConfig::from_env();
                assert_eq!(
                    cfg,
                    RateLimitConfig {
                        per_sec: 10,
                        burst: 25,
                    }
                );
            },
        );
    }

    #[test]
    fn config_rejects_wildcard_origins() {
        let err = AppConfig::from_cli(cli("secret", "http://a.example, *")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn config_rejects_a_blank_jwt_secret() {
        let err = AppConfig::from_cli(cli("   ", "http://a.example")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
