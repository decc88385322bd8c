/// 二维码编码（文本 → JPEG）
pub mod encoder;
/// 三个生成端点与路由
pub mod handler;

pub use handler::create_qr_router;
