/// 健康检查
pub mod health;
/// 二维码生成端点
pub mod qr;
/// 上传提供方对接与临时文件生命周期
pub mod upload;
