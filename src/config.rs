//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调常量”集中到 `ViewerConfig`：CDN 地址、文件名前缀、离线目录、
//! 编号范围、窗口初始尺寸、体积与像素上限。
//! 默认值与原始程序行为一致，因此没有配置文件时一切照旧。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用配置。
//! - 可选读取可执行文件旁的 `cat-viewer.json`，字段缺省时回落到默认值（`#[serde(default)]`）。
//! - `validate` 在启动时一次性校验，避免运行中才暴露配置错误。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::image_pipeline::ImageId;
use crate::render::Backend;

/// 配置文件名（位于可执行文件同目录）。
pub const CONFIG_FILE_NAME: &str = "cat-viewer.json";

/// 配置加载与校验错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("读取配置文件失败：{0}")]
    Io(#[from] std::io::Error),

    #[error("解析配置文件失败：{0}")]
    Parse(#[from] serde_json::Error),

    #[error("配置无效：{0}")]
    Invalid(String),
}

/// 查看器配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// CDN 根地址（协议 + 主机 [+ 端口]）。
    pub cdn_base_url: String,
    /// 图片文件名前缀，同时也是 CDN 上的目录名。
    pub image_prefix: String,
    /// 离线图片所在的子目录名。
    pub offline_folder: String,
    /// 离线目录的上级目录；`None` 表示可执行文件所在目录。
    pub offline_base_dir: Option<PathBuf>,
    /// HTTP User-Agent。
    pub user_agent: String,
    /// 编号上限（随机刷新与输入校验共用）。
    pub max_identifier: u32,
    /// 启动时加载的编号。
    pub initial_identifier: u32,
    /// 启动时使用的渲染后端。
    pub initial_backend: Backend,
    /// 启动时是否处于离线模式。
    pub start_offline: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// 下载/读取原始字节时允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 建立连接超时（秒）；`None` 使用 HTTP 客户端默认行为。
    pub connect_timeout_secs: Option<u64>,
    /// 整体下载超时（秒）；`None` 使用 HTTP 客户端默认行为。
    pub download_timeout_secs: Option<u64>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            cdn_base_url: "https://cdn.garythe.cat".to_string(),
            image_prefix: "Gary".to_string(),
            offline_folder: "Gary".to_string(),
            offline_base_dir: None,
            user_agent: "Win32CatViewer".to_string(),
            max_identifier: 640,
            initial_identifier: 1,
            initial_backend: Backend::Modern,
            start_offline: false,
            window_width: 900,
            window_height: 600,
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            connect_timeout_secs: None,
            download_timeout_secs: None,
        }
    }
}

impl ViewerConfig {
    /// 读取可执行文件旁的配置文件。
    ///
    /// 文件不存在时返回默认配置；存在但无效时返回错误，由调用方决定是否回退。
    pub fn load_beside_executable() -> Result<Self, ConfigError> {
        Self::load_or_default(&executable_dir().join(CONFIG_FILE_NAME))
    }

    /// 从指定路径读取配置；文件不存在时返回默认配置。
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("未找到配置文件，使用默认配置 - 路径: {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;

        log::info!("⚙️ 已加载配置文件 - 路径: {}", path.display());
        Ok(config)
    }

    /// 校验配置取值。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_identifier == 0 {
            return Err(ConfigError::Invalid("max_identifier 必须大于 0".to_string()));
        }
        if !(1..=self.max_identifier).contains(&self.initial_identifier) {
            return Err(ConfigError::Invalid(format!(
                "initial_identifier 必须在 1~{} 之间",
                self.max_identifier
            )));
        }
        if self.image_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("image_prefix 不能为空".to_string()));
        }
        if self.offline_folder.trim().is_empty() {
            return Err(ConfigError::Invalid("offline_folder 不能为空".to_string()));
        }
        if !(self.cdn_base_url.starts_with("https://") || self.cdn_base_url.starts_with("http://")) {
            return Err(ConfigError::Invalid(format!(
                "cdn_base_url 必须以 http:// 或 https:// 开头：{}",
                self.cdn_base_url
            )));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(ConfigError::Invalid("窗口尺寸不能为 0".to_string()));
        }
        if self.max_file_size == 0 || self.max_decoded_pixels == 0 {
            return Err(ConfigError::Invalid("体积与像素上限必须大于 0".to_string()));
        }
        Ok(())
    }

    /// 启动编号（已校验范围，校验前调用时回落到 1）。
    pub fn initial_image_id(&self) -> ImageId {
        ImageId::new(self.initial_identifier).unwrap_or(ImageId::MIN)
    }

    /// 离线目录：`<base>/<offline_folder>`。
    pub fn offline_dir(&self) -> PathBuf {
        let base = self
            .offline_base_dir
            .clone()
            .unwrap_or_else(executable_dir);
        base.join(&self.offline_folder)
    }
}

/// 可执行文件所在目录；无法获取时回落到当前目录。
pub fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_temp_dir() -> PathBuf {
        static COUNTER: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);
        let seq = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let dir = std::env::temp_dir().join(format!("cat-viewer-config-test-{nanos}-{seq}"));
        std::fs::create_dir_all(&dir).expect("create temp dir failed");
        dir
    }

    #[test]
    fn default_config_matches_original_constants() {
        let config = ViewerConfig::default();

        assert_eq!(config.cdn_base_url, "https://cdn.garythe.cat");
        assert_eq!(config.image_prefix, "Gary");
        assert_eq!(config.max_identifier, 640);
        assert_eq!((config.window_width, config.window_height), (900, 600));
        assert_eq!(config.initial_backend, Backend::Modern);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = unique_temp_dir();
        let config = ViewerConfig::load_or_default(&dir.join(CONFIG_FILE_NAME))
            .expect("missing file should yield defaults");

        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let dir = unique_temp_dir();
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "max_identifier": 10, "initial_backend": "legacy" }"#)
            .expect("write config failed");

        let config = ViewerConfig::load_or_default(&path).expect("config should parse");

        assert_eq!(config.max_identifier, 10);
        assert_eq!(config.initial_backend, Backend::Legacy);
        assert_eq!(config.image_prefix, "Gary");
    }

    #[test]
    fn validate_rejects_out_of_range_initial_identifier() {
        let config = ViewerConfig {
            max_identifier: 5,
            initial_identifier: 6,
            ..ViewerConfig::default()
        };

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_json_is_reported() {
        let dir = unique_temp_dir();
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").expect("write config failed");

        assert!(matches!(
            ViewerConfig::load_or_default(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
