use axum::{
    http::{StatusCode, header},
    response::IntoResponse,
};

use qrlink_backend::error::UploadError;

async fn problem_json(resp: axum::response::Response) -> serde_json::Value {
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .expect("missing Content-Type")
        .to_str()
        .expect("invalid Content-Type")
        .to_string();
    assert_eq!(content_type, "application/problem+json");

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

/// 契约关键点：全局错误必须为 RFC7807 ProblemDetails（application/problem+json）。
#[tokio::test]
async fn app_error_into_response_is_problem_details() {
    let resp = qrlink_backend::AppError::Validation("仅支持 .jpg/.jpeg/.png 图片文件".to_string())
        .into_response();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let v = problem_json(resp).await;

    // 核心字段（强一致契约）
    assert_eq!(v["status"], 422);
    assert_eq!(v["code"], "VALIDATION_FAILED");
    assert!(v.get("type").is_some());
    assert!(v.get("title").is_some());
    assert!(v.get("detail").is_some());
}

/// 上游失败按种类映射到网关状态码，错误码可程序化区分。
#[tokio::test]
async fn upload_errors_map_to_gateway_statuses() {
    let resp = qrlink_backend::AppError::Upload(UploadError::Status(503)).into_response();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let v = problem_json(resp).await;
    assert_eq!(v["code"], "UPLOAD_FAILED");

    let resp = qrlink_backend::AppError::Upload(UploadError::Timeout).into_response();
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    let v = problem_json(resp).await;
    assert_eq!(v["code"], "UPSTREAM_TIMEOUT");

    let resp = qrlink_backend::AppError::Upload(UploadError::Contract(
        "缺少 data.downloadPage".to_string(),
    ))
    .into_response();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let v = problem_json(resp).await;
    assert_eq!(v["code"], "UPLOAD_CONTRACT");
}

/// 二维码容量超限应表现为校验类错误，而不是 500。
#[tokio::test]
async fn qr_capacity_error_is_unprocessable() {
    let resp = qrlink_backend::AppError::QrCapacity("输入过长".to_string()).into_response();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let v = problem_json(resp).await;
    assert_eq!(v["code"], "QR_CAPACITY");
}
