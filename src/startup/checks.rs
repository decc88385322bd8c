use crate::config::AppConfig;
use crate::error::AppError;
use std::fs;

/// 执行启动检查
///
/// 1. 检查并创建临时文件目录
/// 2. 检查静态资源目录（仅告警，不阻断启动）
pub async fn run_startup_checks(config: &AppConfig) -> Result<(), AppError> {
    tracing::info!("🔍 开始执行启动检查...");

    ensure_temp_dir(config)?;
    check_static_dir(config);

    tracing::info!("✅ 启动检查完成");
    Ok(())
}

/// 确保临时文件目录存在
fn ensure_temp_dir(config: &AppConfig) -> Result<(), AppError> {
    let temp_dir = config.temp_dir();

    if !temp_dir.exists() {
        tracing::warn!("📁 未找到临时文件目录，正在创建: {:?}", temp_dir);
        fs::create_dir_all(&temp_dir)
            .map_err(|e| AppError::Internal(format!("创建临时文件目录失败: {e}")))?;
        tracing::info!("✅ 临时文件目录创建成功");
    } else {
        tracing::info!("✅ 临时文件目录已存在: {:?}", temp_dir);
    }

    Ok(())
}

/// 检查静态资源目录（缺失不阻断启动，前端页面可单独部署）
fn check_static_dir(config: &AppConfig) {
    if !config.static_assets.enabled {
        return;
    }
    let static_dir = config.static_dir();
    if static_dir.exists() {
        tracing::info!("✅ 静态资源目录已存在: {:?}", static_dir);
    } else {
        tracing::warn!("⚠️ 静态资源目录不存在: {:?}（根路径将返回 404）", static_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::ensure_temp_dir;
    use crate::config::AppConfig;

    #[test]
    fn ensure_temp_dir_creates_missing_directory() {
        let dir = std::env::temp_dir().join(format!(
            "qrlink-startup-{}",
            uuid::Uuid::new_v4().simple()
        ));
        let mut config = AppConfig::default();
        config.upload.temp_dir = dir.to_string_lossy().into_owned();

        assert!(!dir.exists());
        ensure_temp_dir(&config).expect("create temp dir");
        assert!(dir.is_dir());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
