use image::{DynamicImage, Luma};
use qrcode::{EcLevel, QrCode, types::QrError};
use std::io::Cursor;

use crate::config::QrConfig;
use crate::error::AppError;

/// 将任意文本编码为 JPEG 二维码字节串。
///
/// 参数对齐旧实现：纠错等级 H、模块 10 像素、静区保留、黑底白字反转为
/// 黑码白底；符号版本按内容长度自动选择（fit）。不做任何缓存，相同输入
/// 每次都重新编码。
pub fn encode_jpeg(data: &str, options: QrConfig) -> Result<Vec<u8>, AppError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::H).map_err(|e| {
        match e {
            QrError::DataTooLong => AppError::QrCapacity(format!(
                "输入长度 {} 字节超出 H 纠错档位的符号容量",
                data.len()
            )),
            other => AppError::QrEncode(other.to_string()),
        }
    })?;

    let size = options.module_size.max(1);
    let luma = code
        .render::<Luma<u8>>()
        .module_dimensions(size, size)
        .quiet_zone(options.quiet_zone)
        .dark_color(Luma([0u8]))
        .light_color(Luma([255u8]))
        .build();

    // 旧实现 convert("RGB") 后保存 JPEG；保持三通道输出一致。
    let rgb = DynamicImage::ImageLuma8(luma).to_rgb8();
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(rgb)
        .write_to(&mut buf, image::ImageFormat::Jpeg)
        .map_err(|e| AppError::QrEncode(format!("JPEG 序列化失败: {e}")))?;
    Ok(buf.into_inner())
}
