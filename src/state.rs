use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{AppConfig, QrConfig};
use crate::error::UploadError;
use crate::features::upload::UploadClient;

/// 聚合的应用共享状态
///
/// 请求之间没有可变共享：这里只有只读配置与可复用的 HTTP 客户端。
#[derive(Clone)]
pub struct AppState {
    pub upload_client: Arc<UploadClient>,
    /// 临时文件目录
    pub temp_dir: Arc<PathBuf>,
    /// 二维码渲染参数
    pub qr: QrConfig,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self, UploadError> {
        Ok(Self {
            upload_client: Arc::new(UploadClient::new(&config.upload)?),
            temp_dir: Arc::new(config.temp_dir()),
            qr: config.qr,
        })
    }
}
