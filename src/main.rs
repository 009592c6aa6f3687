mod cli;
mod core;
mod features;
mod modules;
mod shared;

use crate::cli::{Cli, Command};
use crate::core::config::Config;
use crate::core::middleware::AuthState;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::audit::{routes as audit_routes, AuditRecorder};
use crate::features::auth::{routes as auth_routes, AuthService, JwtValidator};
use crate::features::categories::{routes as categories_routes, CategoryService};
use crate::features::courses::{routes as courses_routes, CourseImageService, CourseService};
use crate::features::enrollments::{routes as enrollments_routes, EnrollmentService};
use crate::features::users::{routes as users_routes, RoleService, UserService};
use crate::features::web::{routes as web_routes, WebState};
use crate::modules::storage::MinIOClient;
use axum::{middleware::from_fn, Router};
use clap::Parser;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli, worker_threads))
}

async fn async_main(cli: Cli, worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("Configuration loaded successfully");

    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    // Run migrations automatically
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    match cli.command {
        None | Some(Command::Serve) => serve(config, pool, worker_threads).await,
        Some(command) => cli::run(command, &config, pool).await,
    }
}

async fn serve(config: Config, pool: PgPool, worker_threads: usize) -> anyhow::Result<()> {
    let available_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        available_cpus,
        worker_threads,
        std::process::id()
    );

    // Initialize auth
    let jwt_validator = Arc::new(JwtValidator::new(&config.auth));
    let user_service = Arc::new(UserService::new(pool.clone()));
    let auth_state = AuthState::new(Arc::clone(&jwt_validator), Arc::clone(&user_service));

    let audit_recorder = Arc::new(AuditRecorder::new(pool.clone()));
    let auth_service = Arc::new(AuthService::new(
        user_service,
        jwt_validator,
        Arc::clone(&audit_recorder),
    ));
    tracing::info!("Auth configuration initialized");

    let storage = Arc::new(MinIOClient::new(&config.minio)?);
    storage.ensure_bucket_exists().await;
    tracing::info!("MinIO storage client initialized");

    let role_service = Arc::new(RoleService::new(pool.clone(), Arc::clone(&audit_recorder)));
    let category_service = Arc::new(CategoryService::new(
        pool.clone(),
        Arc::clone(&audit_recorder),
    ));
    let course_service = Arc::new(CourseService::new(pool.clone(), Arc::clone(&audit_recorder)));
    let course_image_service = Arc::new(CourseImageService::new(
        Arc::clone(&course_service),
        storage,
    ));
    let enrollment_service = Arc::new(EnrollmentService::new(
        pool.clone(),
        Arc::clone(&audit_recorder),
    ));
    tracing::info!("Catalog, enrollment and audit services initialized");

    let web_state = WebState {
        auth: auth_state.clone(),
        accounts: Arc::clone(&auth_service),
        categories: Arc::clone(&category_service),
        courses: Arc::clone(&course_service),
        images: Arc::clone(&course_image_service),
        enrollments: Arc::clone(&enrollment_service),
        secure_cookies: config.app.secure_cookies,
    };

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    // Build swagger router
    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    // Protected routes (require a bearer token)
    let protected_routes = Router::new()
        .merge(users_routes::routes(role_service))
        .merge(categories_routes::admin_routes(Arc::clone(&category_service)))
        .merge(courses_routes::routes(course_service))
        .merge(courses_routes::image_routes(course_image_service))
        .merge(enrollments_routes::routes(enrollment_service))
        .merge(audit_routes::routes(audit_recorder))
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    // Simple health check endpoint (no auth required)
    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    // Public routes (no auth required)
    let public_routes = Router::new()
        .merge(auth_routes::public_routes(auth_service))
        .merge(categories_routes::routes(category_service));

    let app = Router::new()
        .merge(swagger)
        .merge(protected_routes)
        .merge(public_routes)
        .merge(health_route)
        .merge(web_routes::routes(web_state))
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(256 * 1024)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(65535)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app).await?;

    Ok(())
}
