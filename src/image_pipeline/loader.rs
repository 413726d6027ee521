//! # 字节来源模块
//!
//! ## 设计思路
//!
//! 按编号获取编码后的图片字节，来源只有两种：本地离线目录与 CDN。
//! 离线模式下先读磁盘，失败后回退网络一次；在线模式只走网络，失败不回退磁盘。
//! 这是整个系统唯一的“重试”策略。
//!
//! ## 实现思路
//!
//! - 磁盘：`<离线目录>/<前缀><编号>.jpg`，不存在 / 不可读 / 空文件都视为失败并回退。
//! - 网络：单次 GET `<cdn>/<前缀>/<前缀><编号>.jpg`，使用客户端默认重定向与 TLS 校验，
//!   不设重试；响应体按块累积直到结束，零字节即失败。
//! - 网络错误统一映射到 `FetchError`，对调用方而言都是“获取失败”。

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::source::{ByteOrigin, ImageId, RawImageBytes};
use super::FetchError;
use crate::config::ViewerConfig;

const BUFFER_INITIAL_CAPACITY: usize = 64 * 1024;

/// 字节来源接口。
///
/// 返回的 future 需要 `Send`，以便在后台任务中执行。
pub trait ByteSource: Send + Sync {
    /// 获取编号对应的原始字节。`offline` 为真时优先读取本地文件。
    fn fetch(
        &self,
        identifier: ImageId,
        offline: bool,
    ) -> impl Future<Output = Result<RawImageBytes, FetchError>> + Send;
}

/// 离线目录 + CDN 的默认字节来源。
pub struct CdnByteSource {
    client: reqwest::Client,
    base_url: String,
    image_prefix: String,
    offline_dir: PathBuf,
    max_file_size: u64,
}

impl CdnByteSource {
    /// 根据配置创建来源；HTTP 客户端在此构建并复用。
    pub fn new(config: &ViewerConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.download_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Network(format!("无法创建 HTTP 客户端：{}", e)))?;

        Ok(Self {
            client,
            base_url: config.cdn_base_url.trim_end_matches('/').to_string(),
            image_prefix: config.image_prefix.clone(),
            offline_dir: config.offline_dir(),
            max_file_size: config.max_file_size,
        })
    }

    /// 编号对应的文件名：`<前缀><编号>.jpg`。
    pub fn file_name(&self, identifier: ImageId) -> String {
        format!("{}{}.jpg", self.image_prefix, identifier)
    }

    /// 编号对应的 CDN 地址。
    pub fn remote_url(&self, identifier: ImageId) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            self.image_prefix,
            self.file_name(identifier)
        )
    }

    /// 编号对应的离线文件路径。
    pub fn local_path(&self, identifier: ImageId) -> PathBuf {
        self.offline_dir.join(self.file_name(identifier))
    }

    /// 从本地离线目录读取。
    pub async fn read_local(&self, identifier: ImageId) -> Result<RawImageBytes, FetchError> {
        let path = self.local_path(identifier);
        log::info!("📁 读取离线图片 - 路径: {}", path.display());
        read_file_with_limit(&path, self.max_file_size).await
    }

    /// 从 CDN 下载。
    pub async fn download(&self, identifier: ImageId) -> Result<RawImageBytes, FetchError> {
        let url = self.remote_url(identifier);
        log::info!("🌐 开始下载图片 - URL: {}", url);

        let mut response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                reason: status_message(status.as_u16()),
            });
        }

        if let Some(size) = response.content_length() {
            if size > self.max_file_size {
                return Err(too_large(size, self.max_file_size));
            }
        }

        let initial_capacity = response
            .content_length()
            .map(|len| len.min(self.max_file_size) as usize)
            .filter(|len| *len > 0)
            .unwrap_or(BUFFER_INITIAL_CAPACITY);
        let mut buffer = Vec::with_capacity(initial_capacity);

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Network(format!("下载失败：{}", e)))?
        {
            if buffer.len() as u64 + chunk.len() as u64 > self.max_file_size {
                return Err(FetchError::ResourceLimit("下载后文件超过大小限制".to_string()));
            }
            buffer.extend_from_slice(&chunk);
        }

        log::debug!("✅ 下载完成 - {} bytes", buffer.len());
        RawImageBytes::new(buffer, ByteOrigin::Network).ok_or(FetchError::Empty)
    }
}

impl ByteSource for CdnByteSource {
    async fn fetch(&self, identifier: ImageId, offline: bool) -> Result<RawImageBytes, FetchError> {
        if offline {
            match self.read_local(identifier).await {
                Ok(raw) => return Ok(raw),
                Err(err) => {
                    log::warn!("⚠️ 离线读取失败，回退网络下载 - 编号: {} 原因: {}", identifier, err);
                }
            }
        }

        self.download(identifier).await
    }
}

/// 读取本地文件，带体积上限；空文件视为失败。
async fn read_file_with_limit(path: &Path, max_file_size: u64) -> Result<RawImageBytes, FetchError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| FetchError::FileSystem(format!("无法读取文件信息：{}：{}", path.display(), e)))?;

    if metadata.len() > max_file_size {
        return Err(too_large(metadata.len(), max_file_size));
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| FetchError::FileSystem(format!("无法读取图片文件：{}", e)))?;

    RawImageBytes::new(bytes, ByteOrigin::Disk).ok_or(FetchError::Empty)
}

fn too_large(size: u64, limit: u64) -> FetchError {
    FetchError::ResourceLimit(format!(
        "文件过大：{:.2} MB（限制：{:.2} MB）",
        size as f64 / 1024.0 / 1024.0,
        limit as f64 / 1024.0 / 1024.0
    ))
}

/// 统一映射 reqwest 错误。
fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Network(format!("下载超时：{}", e))
    } else if e.is_connect() {
        FetchError::Network(format!("无法连接：{}", e))
    } else {
        FetchError::Network(format!("请求失败：{}", e))
    }
}

/// 常见 HTTP 状态码文案。
fn status_message(code: u16) -> &'static str {
    match code {
        404 => "未找到",
        403 => "访问被拒绝",
        500..=599 => "服务器错误",
        _ => "请求失败",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with(base_url: &str, offline_dir: &Path) -> CdnByteSource {
        let config = ViewerConfig {
            cdn_base_url: base_url.to_string(),
            offline_base_dir: Some(offline_dir.to_path_buf()),
            ..ViewerConfig::default()
        };
        CdnByteSource::new(&config).expect("source init failed")
    }

    #[test]
    fn remote_url_follows_cdn_layout() {
        let source = source_with("https://cdn.garythe.cat/", Path::new("."));
        let id = ImageId::new(7).expect("valid id");

        assert_eq!(source.remote_url(id), "https://cdn.garythe.cat/Gary/Gary7.jpg");
    }

    #[test]
    fn local_path_uses_offline_folder() {
        let source = source_with("https://cdn.garythe.cat", Path::new("/opt/viewer"));
        let id = ImageId::new(640).expect("valid id");

        assert_eq!(
            source.local_path(id),
            Path::new("/opt/viewer").join("Gary").join("Gary640.jpg")
        );
    }

    #[test]
    fn status_message_is_expected() {
        assert_eq!(status_message(404), "未找到");
        assert_eq!(status_message(503), "服务器错误");
        assert_eq!(status_message(418), "请求失败");
    }
}
