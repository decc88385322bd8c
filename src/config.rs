use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "ServerConfig::default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
}

impl ServerConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }
    fn default_port() -> u16 {
        8000
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    /// 日志格式
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
    fn default_format() -> String {
        "full".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: Self::default_format(),
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀（空字符串表示挂载在根路径，与旧实现一致）
    #[serde(default)]
    pub prefix: String,
    /// 兼容模式：错误一律返回 200 + {"error": "..."}（复刻旧实现线上行为）
    #[serde(default)]
    pub legacy_error_payload: bool,
}

impl ApiConfig {
    /// 规范化后的路由前缀。
    ///
    /// 空串与 "/" 表示挂载在根路径（返回 None）；其余情况去掉尾斜杠并
    /// 补齐前导 '/'，配置写成 "api" 或 "/api/" 都不会让 nest 在启动时崩溃。
    pub fn normalized_prefix(&self) -> Option<String> {
        let trimmed = self.prefix.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(trimmed.to_string())
        } else {
            Some(format!("/{trimmed}"))
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            legacy_error_payload: false,
        }
    }
}

/// CORS 配置
///
/// 默认全放开（任意来源/方法/请求头），与旧实现的公开演示策略一致；
/// 生产部署应在 config.toml 中收紧 allowed_origins。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default = "CorsConfig::default_enabled")]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_any")]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_any")]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_any")]
    pub allowed_headers: Vec<String>,
    /// 是否允许携带凭证（Cookie/Authorization）
    #[serde(default)]
    pub allow_credentials: bool,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CorsConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_any() -> Vec<String> {
        vec!["*".to_string()]
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allowed_origins: Self::default_any(),
            allowed_methods: Self::default_any(),
            allowed_headers: Self::default_any(),
            allow_credentials: false,
            max_age_secs: None,
        }
    }
}

/// 上传提供方配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 上传端点（multipart POST）
    #[serde(default = "UploadConfig::default_endpoint")]
    pub endpoint: String,
    /// 出站请求超时（秒）。旧实现未设置超时，上游无响应会挂死请求。
    #[serde(default = "UploadConfig::default_timeout")]
    pub timeout_secs: u64,
    /// 临时文件目录
    #[serde(default = "UploadConfig::default_temp_dir")]
    pub temp_dir: String,
    /// 请求体大小上限（字节）
    #[serde(default = "UploadConfig::default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl UploadConfig {
    fn default_endpoint() -> String {
        "https://store1.gofile.io/uploadFile".to_string()
    }
    fn default_timeout() -> u64 {
        30
    }
    fn default_temp_dir() -> String {
        "./tmp".to_string()
    }
    fn default_max_body_bytes() -> usize {
        64 * 1024 * 1024
    }

    /// 获取出站超时时间
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            timeout_secs: Self::default_timeout(),
            temp_dir: Self::default_temp_dir(),
            max_body_bytes: Self::default_max_body_bytes(),
        }
    }
}

/// 二维码渲染配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QrConfig {
    /// 单个模块的边长（像素）
    #[serde(default = "QrConfig::default_module_size")]
    pub module_size: u32,
    /// 是否保留 4 模块静区（quiet zone）
    #[serde(default = "QrConfig::default_quiet_zone")]
    pub quiet_zone: bool,
}

impl QrConfig {
    fn default_module_size() -> u32 {
        10
    }
    fn default_quiet_zone() -> bool {
        true
    }
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            module_size: Self::default_module_size(),
            quiet_zone: Self::default_quiet_zone(),
        }
    }
}

/// 静态资源配置（前端页面）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticAssetsConfig {
    /// 是否挂载静态资源
    #[serde(default = "StaticAssetsConfig::default_enabled")]
    pub enabled: bool,
    /// 静态资源目录
    #[serde(default = "StaticAssetsConfig::default_dir")]
    pub dir: String,
}

impl StaticAssetsConfig {
    fn default_enabled() -> bool {
        true
    }
    fn default_dir() -> String {
        "./static".to_string()
    }
}

impl Default for StaticAssetsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            dir: Self::default_dir(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 上传提供方配置
    #[serde(default)]
    pub upload: UploadConfig,
    /// 二维码渲染配置
    #[serde(default)]
    pub qr: QrConfig,
    /// 静态资源配置
    #[serde(default, rename = "static")]
    pub static_assets: StaticAssetsConfig,
}

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖
    ///
    /// config.toml 为可选：缺省时走默认值，便于零配置启动。
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件（可选）", config_path);

        let builder = ConfigBuilder::builder()
            // 加载配置文件（允许缺失）
            .add_source(File::from(config_path).required(false))
            // 支持环境变量覆盖，例如：APP_UPLOAD_ENDPOINT
            .add_source(
                Environment::with_prefix("APP")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = builder.try_deserialize()?;
        Ok(config)
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 获取全局配置单例（未初始化时返回 None，测试环境使用）
    pub fn try_global() -> Option<&'static AppConfig> {
        CONFIG.get()
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<(), ConfigError> {
        Self::init_global_with(Self::load()?)
    }

    /// 以给定配置初始化全局单例。
    ///
    /// 单例一经置入无法复位，依赖它的测试应放在独立的集成测试二进制里。
    pub fn init_global_with(config: AppConfig) -> Result<(), ConfigError> {
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))
    }

    /// 获取配置文件路径
    fn get_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 获取临时文件目录
    pub fn temp_dir(&self) -> PathBuf {
        PathBuf::from(&self.upload.temp_dir)
    }

    /// 获取静态资源目录
    pub fn static_dir(&self) -> PathBuf {
        PathBuf::from(&self.static_assets.dir)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            api: ApiConfig::default(),
            cors: CorsConfig::default(),
            upload: UploadConfig::default(),
            qr: QrConfig::default(),
            static_assets: StaticAssetsConfig::default(),
        }
    }
}
