use serde::Deserialize;
use std::path::Path;

use crate::config::UploadConfig;
use crate::error::UploadError;

/// 提供方成功响应（只取用到的字段路径 data.downloadPage）
#[derive(Debug, Deserialize)]
struct ProviderResponse {
    data: ProviderData,
}

#[derive(Debug, Deserialize)]
struct ProviderData {
    #[serde(rename = "downloadPage")]
    download_page: String,
}

/// 外部文件托管客户端。
///
/// 单次 multipart POST，不重试；出站超时由配置给定（默认 30s），
/// 避免上游无响应时把本端请求挂死。
pub struct UploadClient {
    endpoint: String,
    client: reqwest::Client,
}

impl UploadClient {
    pub fn new(config: &UploadConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout_duration())
            .build()?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            client,
        })
    }

    /// 上传临时文件，返回提供方的下载页 URL。
    pub async fn upload(&self, path: &Path, original_name: &str) -> Result<String, UploadError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UploadError::Io(e.to_string()))?;
        let size = bytes.len();

        let part = reqwest::multipart::Part::bytes(bytes).file_name(original_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        tracing::debug!("上传 {} 字节到 {}", size, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("上传提供方返回非 2xx: {}", status);
            return Err(UploadError::Status(status.as_u16()));
        }

        // 不信任上游 content-type，按文本取回后再解析，解析失败归为契约错误。
        let body = response.text().await?;
        let parsed: ProviderResponse = serde_json::from_str(&body)
            .map_err(|e| UploadError::Contract(format!("缺少或无法解析 data.downloadPage: {e}")))?;
        Ok(parsed.data.download_page)
    }
}

#[cfg(test)]
mod tests {
    use super::UploadClient;
    use crate::config::UploadConfig;
    use crate::error::UploadError;
    use axum::{Router, http::StatusCode, routing::post};
    use std::path::PathBuf;

    async fn spawn_provider(status: StatusCode, body: &'static str) -> String {
        let app = Router::new().route("/uploadFile", post(move || async move { (status, body) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve provider");
        });
        format!("http://{addr}/uploadFile")
    }

    fn client_for(endpoint: String) -> UploadClient {
        let config = UploadConfig {
            endpoint,
            timeout_secs: 5,
            ..UploadConfig::default()
        };
        UploadClient::new(&config).expect("build client")
    }

    async fn write_fixture() -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "qrlink-client-{}.bin",
            uuid::Uuid::new_v4().simple()
        ));
        tokio::fs::write(&path, b"fixture-bytes")
            .await
            .expect("write fixture");
        path
    }

    #[tokio::test]
    async fn upload_parses_download_page_url() {
        let endpoint =
            spawn_provider(StatusCode::OK, r#"{"data":{"downloadPage":"https://example.com/abc123"}}"#)
                .await;
        let path = write_fixture().await;

        let url = client_for(endpoint)
            .upload(&path, "photo.png")
            .await
            .expect("upload ok");
        assert_eq!(url, "https://example.com/abc123");

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn upstream_503_maps_to_status_error() {
        let endpoint = spawn_provider(StatusCode::SERVICE_UNAVAILABLE, "overloaded").await;
        let path = write_fixture().await;

        let err = client_for(endpoint)
            .upload(&path, "photo.png")
            .await
            .expect_err("expected status error");
        assert!(
            matches!(err, UploadError::Status(503)),
            "expected Status(503), got: {err:?}"
        );

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn malformed_body_maps_to_contract_error() {
        let endpoint = spawn_provider(StatusCode::OK, r#"{"status":"ok"}"#).await;
        let path = write_fixture().await;

        let err = client_for(endpoint)
            .upload(&path, "photo.png")
            .await
            .expect_err("expected contract error");
        assert!(
            matches!(err, UploadError::Contract(_)),
            "expected Contract, got: {err:?}"
        );

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn missing_temp_file_maps_to_io_error() {
        let endpoint = spawn_provider(StatusCode::OK, "{}").await;
        let path = PathBuf::from("/nonexistent/qrlink-missing.bin");

        let err = client_for(endpoint)
            .upload(&path, "photo.png")
            .await
            .expect_err("expected io error");
        assert!(matches!(err, UploadError::Io(_)), "got: {err:?}");
    }
}
