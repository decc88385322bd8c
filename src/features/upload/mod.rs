/// 外部文件托管客户端
pub mod client;
/// 作用域临时文件
pub mod temp;

pub use client::UploadClient;
pub use temp::TempUpload;
