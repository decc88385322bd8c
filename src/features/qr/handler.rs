use axum::{
    Form, Router,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartRejection, rejection::FormRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    routing::post,
};
use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;

use crate::error::{AppError, ProblemDetails};
use crate::features::upload::TempUpload;
use crate::state::AppState;

use super::encoder;

/// 图片端点允许的扩展名（大小写不敏感）
const ALLOWED_IMAGE_EXTS: [&str; 3] = ["jpg", "jpeg", "png"];

/// 文本端点表单
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LinkForm {
    /// 待编码的链接，必须以 http:// 或 https:// 开头
    #[schema(example = "https://example.com/abc123")]
    pub link: String,
}

/// multipart 中取出的上传内容
struct FileField {
    filename: String,
    bytes: Bytes,
}

/// 临时文件命名策略（图片端点只保留扩展名，文件端点保留原始文件名）
enum TempNaming {
    Extension(String),
    Filename,
}

#[utoipa::path(
    post,
    path = "/generate-qr-image/",
    summary = "图片 → 二维码",
    description = "上传一张图片（.jpg/.jpeg/.png），转存至文件托管服务后，将下载页链接编码为二维码 JPEG 返回。扩展名不合法时直接拒绝，不触发任何外部调用。",
    request_body(content_type = "multipart/form-data", description = "字段 file：图片文件"),
    responses(
        (status = 200, description = "二维码 JPEG（attachment）", content_type = "image/jpeg"),
        (status = 400, description = "multipart 表单不合法", body = ProblemDetails),
        (status = 422, description = "扩展名不在允许列表", body = ProblemDetails),
        (status = 502, description = "上传提供方失败", body = ProblemDetails),
        (status = 504, description = "上传提供方超时", body = ProblemDetails)
    ),
    tag = "QR"
)]
pub async fn generate_qr_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, HeaderMap, Bytes), AppError> {
    let upload = read_file_field(multipart?).await?;

    let ext = extension_of(&upload.filename);
    if !is_allowed_image_ext(ext.as_deref()) {
        return Err(AppError::Validation(
            "仅支持 .jpg/.jpeg/.png 图片文件".to_string(),
        ));
    }

    let url = host_via_provider(&state, &upload, TempNaming::Extension(ext.unwrap_or_default()))
        .await?;
    let jpeg = encoder::encode_jpeg(&url, state.qr)?;
    Ok(attachment_response("qr_image", jpeg))
}

#[utoipa::path(
    post,
    path = "/generate-qr-file/",
    summary = "任意文件 → 二维码",
    description = "上传任意类型的文件，转存至文件托管服务后，将下载页链接编码为二维码 JPEG 返回。",
    request_body(content_type = "multipart/form-data", description = "字段 file：任意文件"),
    responses(
        (status = 200, description = "二维码 JPEG（attachment）", content_type = "image/jpeg"),
        (status = 400, description = "multipart 表单不合法", body = ProblemDetails),
        (status = 502, description = "上传提供方失败", body = ProblemDetails),
        (status = 504, description = "上传提供方超时", body = ProblemDetails)
    ),
    tag = "QR"
)]
pub async fn generate_qr_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, HeaderMap, Bytes), AppError> {
    let upload = read_file_field(multipart?).await?;

    let url = host_via_provider(&state, &upload, TempNaming::Filename).await?;
    let jpeg = encoder::encode_jpeg(&url, state.qr)?;
    Ok(attachment_response("qr", jpeg))
}

#[utoipa::path(
    post,
    path = "/generate-qr-text/",
    summary = "链接 → 二维码",
    description = "将表单字段 link 中的 URL 编码为二维码 JPEG 返回。仅接受 http:// 或 https:// 开头的链接，不触发任何外部调用。",
    request_body(content = LinkForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "二维码 JPEG（attachment）", content_type = "image/jpeg"),
        (status = 422, description = "链接格式不合法或超出符号容量", body = ProblemDetails)
    ),
    tag = "QR"
)]
pub async fn generate_qr_text(
    State(state): State<AppState>,
    form: Result<Form<LinkForm>, FormRejection>,
) -> Result<(StatusCode, HeaderMap, Bytes), AppError> {
    let Form(form) = form?;
    if !is_supported_link(&form.link) {
        return Err(AppError::Validation(
            "请输入合法的 URL（必须以 http:// 或 https:// 开头）".to_string(),
        ));
    }

    let jpeg = encoder::encode_jpeg(&form.link, state.qr)?;
    Ok(attachment_response("qr_link", jpeg))
}

/// 从 multipart 表单中读取 `file` 字段。
async fn read_file_field(mut multipart: Multipart) -> Result<FileField, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload.bin".to_string());
        let bytes = field.bytes().await?;
        return Ok(FileField { filename, bytes });
    }
    Err(AppError::Multipart("缺少 file 字段".to_string()))
}

/// 写入临时文件并转存至上传提供方，返回下载页 URL。
///
/// `TempUpload` 在函数返回时随作用域释放：上传成功、上游失败、甚至
/// panic 展开都会删除临时文件。
async fn host_via_provider(
    state: &AppState,
    upload: &FileField,
    naming: TempNaming,
) -> Result<String, AppError> {
    let temp = match naming {
        TempNaming::Extension(ext) => {
            TempUpload::with_extension(state.temp_dir.as_ref(), &ext, &upload.bytes).await?
        }
        TempNaming::Filename => {
            TempUpload::with_filename(state.temp_dir.as_ref(), &upload.filename, &upload.bytes)
                .await?
        }
    };

    let url = state
        .upload_client
        .upload(temp.path(), &upload.filename)
        .await?;
    tracing::info!("文件已转存，下载页: {}", url);
    Ok(url)
}

/// 构建 attachment 形式的 JPEG 响应；文件名带随机 hex 后缀，无碰撞检查。
fn attachment_response(prefix: &str, jpeg: Vec<u8>) -> (StatusCode, HeaderMap, Bytes) {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));

    let filename = format!("{prefix}_{}.jpg", Uuid::new_v4().simple());
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename={filename}")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    (StatusCode::OK, headers, Bytes::from(jpeg))
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn is_allowed_image_ext(ext: Option<&str>) -> bool {
    ext.is_some_and(|e| ALLOWED_IMAGE_EXTS.contains(&e))
}

fn is_supported_link(link: &str) -> bool {
    link.starts_with("http://") || link.starts_with("https://")
}

/// 三个端点的路由。旧实现的路径带尾斜杠，这里两种形式都注册，
/// 避免客户端按任一写法访问时拿到 404。
pub fn create_qr_router() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/generate-qr-image/", post(generate_qr_image))
        .route("/generate-qr-image", post(generate_qr_image))
        .route("/generate-qr-file/", post(generate_qr_file))
        .route("/generate-qr-file", post(generate_qr_file))
        .route("/generate-qr-text/", post(generate_qr_text))
        .route("/generate-qr-text", post(generate_qr_text))
}
