use axum::{http::StatusCode, response::Json};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::time::Instant;

/// 进程启动时刻。main 在启动早期调用 mark_started 固定该值，
/// 保证 uptime 从服务启动而非首次探活开始计数。
static STARTED_AT: Lazy<Instant> = Lazy::new(Instant::now);

pub fn mark_started() {
    Lazy::force(&STARTED_AT);
}

/// 健康检查响应
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    #[schema(example = "healthy")]
    pub status: String,
    /// 服务名称
    #[schema(example = "qrlink-backend")]
    pub service: String,
    /// 当前版本（Cargo package version）
    #[schema(example = "0.1.0")]
    pub version: String,
    /// 服务已运行时长（秒）
    #[schema(example = 3600)]
    pub uptime_secs: u64,
}

#[utoipa::path(
    get,
    path = "/health",
    summary = "健康检查",
    description = "用于探活的健康检查端点，返回服务状态、版本与运行时长。",
    responses((status = 200, description = "服务健康", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: STARTED_AT.elapsed().as_secs(),
        }),
    )
}
