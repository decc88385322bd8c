use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::AppError;

/// 作用域临时文件句柄。
///
/// 上传流程的全部失败路径（上游非 2xx、网络错误、handler 提前返回、panic
/// 展开）都必须删除临时文件；这里用 Drop 承担删除职责，持有者离开作用域
/// 即清理，不依赖调用方显式收尾。
pub struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    /// 以 `temp_<uuid><ext>` 命名写入（图片端点：只保留扩展名）。
    pub async fn with_extension(
        dir: &Path,
        extension: &str,
        bytes: &[u8],
    ) -> Result<Self, AppError> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        let suffix = if ext.is_empty() {
            String::new()
        } else {
            format!(".{ext}")
        };
        let name = format!("temp_{}{}", Uuid::new_v4().simple(), suffix);
        Self::write(dir, name, bytes).await
    }

    /// 以 `temp_<uuid>_<name>` 命名写入（任意文件端点：保留原始文件名）。
    pub async fn with_filename(
        dir: &Path,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<Self, AppError> {
        let safe = sanitize_filename(original_name);
        let name = format!("temp_{}_{}", Uuid::new_v4().simple(), safe);
        Self::write(dir, name, bytes).await
    }

    async fn write(dir: &Path, name: String, bytes: &[u8]) -> Result<Self, AppError> {
        // 目录可能在启动后被外部清理，这里按需重建。
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(Self { path })
    }

    /// 临时文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!("清理临时文件失败 {:?}: {}", self.path, e);
        }
    }
}

/// 剥离路径分隔符，防止客户端文件名逃逸出临时目录。
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .filter(|c| !matches!(c, '\0' | ':'))
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "upload.bin".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::{TempUpload, sanitize_filename};
    use std::path::PathBuf;

    fn test_dir() -> PathBuf {
        std::env::temp_dir().join(format!("qrlink-temp-{}", uuid::Uuid::new_v4().simple()))
    }

    #[tokio::test]
    async fn with_extension_writes_and_drop_removes() {
        let dir = test_dir();
        let temp = TempUpload::with_extension(&dir, ".PNG", b"payload")
            .await
            .expect("create temp file");
        let path = temp.path().to_path_buf();

        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("temp_"));
        assert!(name.ends_with(".png"));

        drop(temp);
        assert!(!path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn with_filename_keeps_original_name_suffix() {
        let dir = test_dir();
        let temp = TempUpload::with_filename(&dir, "report.tar.gz", b"payload")
            .await
            .expect("create temp file");
        let name = temp
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(name.starts_with("temp_"));
        assert!(name.ends_with("_report.tar.gz"));

        drop(temp);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn sanitize_filename_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\evil.sh"), "evil.sh");
        assert_eq!(sanitize_filename(""), "upload.bin");
        assert_eq!(sanitize_filename(".."), "upload.bin");
        assert_eq!(sanitize_filename("photo.png"), "photo.png");
    }
}
