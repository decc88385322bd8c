use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// 应用统一错误类型
#[derive(Error, Debug, utoipa::ToSchema)]
pub enum AppError {
    /// 参数校验错误（扩展名不合法 / 链接格式不合法）
    #[error("参数校验错误: {0}")]
    Validation(String),

    /// multipart 表单解析错误（缺少字段、编码损坏等）
    #[error("表单解析错误: {0}")]
    Multipart(String),

    /// 二维码容量超限（输入文本超出 H 纠错档位可容纳的长度）
    #[error("二维码容量超限: {0}")]
    QrCapacity(String),

    /// 二维码编码错误（容量以外的编码失败）
    #[error("二维码编码错误: {0}")]
    QrEncode(String),

    /// 上传提供方错误
    #[error("上传失败: {0}")]
    Upload(#[from] UploadError),

    /// I/O 错误（临时文件读写）
    #[error("I/O 错误: {0}")]
    Io(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 上传提供方错误类型
///
/// 按失败来源区分四类，避免把所有上游问题折叠成一个字符串：
/// - `Status`：上游返回了非 2xx 状态码
/// - `Contract`：上游返回体不符合约定的 JSON 结构
/// - `Timeout`：出站请求超时
/// - `Network`：连接层失败（拒绝连接、DNS 等）
#[derive(Error, Debug, utoipa::ToSchema)]
pub enum UploadError {
    /// 上游返回非 2xx 状态码
    #[error("上游返回状态码 {0}")]
    Status(u16),

    /// 上游响应结构不符合约定（缺少 data.downloadPage 等）
    #[error("上游响应格式错误: {0}")]
    Contract(String),

    /// 出站请求超时
    #[error("上游请求超时")]
    Timeout,

    /// 网络层失败
    #[error("网络错误: {0}")]
    Network(String),

    /// 读取临时文件失败
    #[error("I/O 错误: {0}")]
    Io(String),
}

/// RFC7807 风格的错误响应（Problem Details）。
///
/// 设计目标：
/// - 让所有 API 错误返回结构化 JSON，便于调用方稳定处理
/// - 与 OpenAPI 一致（content-type = application/problem+json）
/// - 保留 requestId 以便问题追踪
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// 问题类型（URI）。若无更细分的类型，可使用 about:blank。
    #[serde(rename = "type")]
    #[schema(example = "about:blank")]
    pub type_url: String,

    /// 简短标题，用于概括错误。
    #[schema(example = "Validation Failed")]
    pub title: String,

    /// HTTP 状态码（与响应 status 一致）。
    #[schema(example = 422)]
    pub status: u16,

    /// 人类可读的详细信息（尽量稳定，不建议依赖解析）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// 稳定的错误码，用于程序化处理。
    #[schema(example = "VALIDATION_FAILED")]
    pub code: String,

    /// 可选：请求追踪 ID。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::QrCapacity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::QrEncode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upload(e) => match e {
                UploadError::Status(_) | UploadError::Contract(_) | UploadError::Network(_) => {
                    StatusCode::BAD_GATEWAY
                }
                UploadError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn stable_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::Multipart(_) => "BAD_REQUEST",
            AppError::QrCapacity(_) => "QR_CAPACITY",
            AppError::QrEncode(_) => "QR_ENCODE_FAILED",
            AppError::Upload(e) => match e {
                UploadError::Status(_) => "UPLOAD_FAILED",
                UploadError::Contract(_) => "UPLOAD_CONTRACT",
                UploadError::Timeout => "UPSTREAM_TIMEOUT",
                UploadError::Network(_) => "UPSTREAM_ERROR",
                UploadError::Io(_) => "IO_ERROR",
            },
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn title(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::UNPROCESSABLE_ENTITY => "Validation Failed",
            StatusCode::BAD_GATEWAY => "Bad Gateway",
            StatusCode::GATEWAY_TIMEOUT => "Gateway Timeout",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // 兼容模式：复刻旧实现的线上行为——一律 200 + {"error": "..."}。
        // 默认关闭；仅在 api.legacy_error_payload = true 时启用。
        if crate::config::AppConfig::try_global()
            .map(|c| c.api.legacy_error_payload)
            .unwrap_or(false)
        {
            return (StatusCode::OK, Json(json!({ "error": self.to_string() }))).into_response();
        }

        let status = self.status_code();
        let problem = ProblemDetails {
            type_url: "about:blank".to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: Some(self.to_string()),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
        };

        let mut res = Json(problem).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}

// =============== Error conversions for common external errors ===============

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UploadError::Timeout
        } else {
            UploadError::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::Multipart(err.to_string())
    }
}

// 提取器拒绝也必须走统一错误边界，否则客户端会拿到框架默认的纯文本响应。

impl From<axum::extract::multipart::MultipartRejection> for AppError {
    fn from(err: axum::extract::multipart::MultipartRejection) -> Self {
        AppError::Multipart(err.body_text())
    }
}

impl From<axum::extract::rejection::FormRejection> for AppError {
    fn from(err: axum::extract::rejection::FormRejection) -> Self {
        AppError::Validation(err.body_text())
    }
}
