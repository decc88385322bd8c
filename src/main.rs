use axum::{Router, routing::get};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use qrlink_backend::features::health::{health_check, mark_started};
use qrlink_backend::features::qr::create_qr_router;
use qrlink_backend::state::AppState;
use qrlink_backend::{
    AppConfig, ShutdownManager, cors::build_cors_layer, request_id::request_id_middleware,
    startup::run_startup_checks,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        qrlink_backend::features::qr::handler::generate_qr_image,
        qrlink_backend::features::qr::handler::generate_qr_file,
        qrlink_backend::features::qr::handler::generate_qr_text,
        qrlink_backend::features::health::handler::health_check,
    ),
    components(
        schemas(
            qrlink_backend::AppError,
            qrlink_backend::error::UploadError,
            qrlink_backend::error::ProblemDetails,
            qrlink_backend::features::qr::handler::LinkForm,
            qrlink_backend::features::health::handler::HealthResponse,
        )
    ),
    tags(
        (name = "QR", description = "QR generation APIs"),
        (name = "Health", description = "Health APIs"),
    ),
    info(
        title = "QR Link Backend API",
        version = "0.1.0",
        description = "File hosting + QR code generation service (Axum)"
    )
)]
pub struct ApiDoc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrlink_backend=info,tower_http=info".into()),
        )
        .init();

    // 固定进程启动时刻（健康检查的 uptime 基准）
    mark_started();

    // 创建优雅退出管理器
    let shutdown_manager = ShutdownManager::new();

    // Load config
    if let Err(e) = AppConfig::init_global() {
        tracing::error!("Config init failed: {}", e);
        std::process::exit(1);
    }
    let config = AppConfig::global();

    // 启动信号处理器
    shutdown_manager.start_signal_handler();

    // Run startup checks
    if let Err(e) = run_startup_checks(config).await {
        tracing::error!("Startup checks failed: {}", e);
        std::process::exit(1);
    }

    // Shared state
    let app_state = match AppState::from_config(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Upload client init failed: {}", e);
            std::process::exit(1);
        }
    };

    // Routes
    let api_router = create_qr_router();
    let api_prefix = config.api.normalized_prefix();

    let mut app = Router::<AppState>::new().route("/health", get(health_check));
    // 前缀规范化后为 None 时并入根路由（axum 不允许 nest 空路径）。
    app = match &api_prefix {
        Some(prefix) => app.nest(prefix, api_router),
        None => app.merge(api_router),
    };
    app = app.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // 静态前端挂载为兜底服务，API 路由优先匹配。
    let mut app = if config.static_assets.enabled {
        app.fallback_service(ServeDir::new(config.static_dir()))
            .with_state(app_state)
    } else {
        app.with_state(app_state)
    };

    // 全局 request_id 中间件
    app = app.layer(axum::middleware::from_fn(request_id_middleware));

    // CORS（默认全放开，对应公开演示场景）
    if let Some(cors) = build_cors_layer(&config.cors) {
        app = app.layer(cors);
    }

    // 响应压缩：主体输出是 JPEG（压缩无收益，tower-http 默认跳过图片），
    // 实际受益的是 JSON 错误与 OpenAPI 文档。
    app = app.layer(CompressionLayer::new());

    // 请求体大小上限（multipart 上传）
    app = app.layer(axum::extract::DefaultBodyLimit::max(
        config.upload.max_body_bytes,
    ));

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!(
        "QR API: http://{}{}/generate-qr-text/",
        addr,
        api_prefix.as_deref().unwrap_or("")
    );
    tracing::info!("Upload provider: {}", config.upload.endpoint);

    // 运行服务器直到收到退出信号
    let graceful = axum::serve(listener, app).with_graceful_shutdown(async move {
        let reason = shutdown_manager.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
    });

    if let Err(e) = graceful.await {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }

    tracing::info!("服务器已优雅关闭");
}
