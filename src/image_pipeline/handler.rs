//! # 加载编排模块
//!
//! ## 设计思路
//!
//! `ImageLoader` 只负责流程编排，不接触任何渲染句柄，因此可以在后台任务中执行。
//! 单次加载链路固定为：
//! 1. 按编号与离线标志获取原始字节（一次）
//! 2. 为每个后端各自打开一个流视图，独立解码两次
//!
//! 位图绑定（需要渲染表面）留给 UI 线程在 `ViewerApp::complete_load` 中完成。
//!
//! ## 实现思路
//!
//! - 记录 `fetch/decode/total` 阶段耗时，便于性能诊断。
//! - 解码是 CPU 密集操作，放在 `spawn_blocking` 中执行，避免占用异步工作线程。

use std::time::Instant;

use super::loader::ByteSource;
use super::pipeline::{DecodeLimits, decode_frame};
use super::source::{DecodedFrame, LoadOutcome, LoadRequest, LoadedImage, RawImageBytes};
use super::{DecodeError, LoadError};

/// 图片加载器。
pub struct ImageLoader<S> {
    source: S,
    limits: DecodeLimits,
}

impl<S: ByteSource> ImageLoader<S> {
    pub fn new(source: S, limits: DecodeLimits) -> Self {
        Self { source, limits }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// 执行一次完整加载；失败不会影响任何应用状态。
    pub async fn load(&self, request: LoadRequest) -> LoadOutcome {
        let result = self.load_image(request).await;
        if let Err(err) = &result {
            log::warn!(
                "⚠️ 图片加载失败 - 编号: {} 离线: {} 代号: {} 原因: {}",
                request.identifier,
                request.offline,
                request.generation,
                err
            );
        }
        LoadOutcome { request, result }
    }

    async fn load_image(&self, request: LoadRequest) -> Result<LoadedImage, LoadError> {
        let total_start = Instant::now();

        let fetch_start = Instant::now();
        let raw = self.source.fetch(request.identifier, request.offline).await?;
        let fetch_elapsed = fetch_start.elapsed();

        let decode_start = Instant::now();
        let limits = self.limits;
        let decode_input = raw.clone();
        let (modern, legacy) = tokio::task::spawn_blocking(move || decode_twice(&decode_input, &limits))
            .await
            .map_err(|e| DecodeError::Decode(format!("解码任务异常结束：{}", e)))??;
        let decode_elapsed = decode_start.elapsed();

        log::info!(
            "✅ 图片加载完成 - 编号: {} 来源: {} 大小: {} bytes 尺寸: {}x{} fetch={}ms decode={}ms total={}ms",
            request.identifier,
            raw.origin().as_str(),
            raw.len(),
            modern.width(),
            modern.height(),
            fetch_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(LoadedImage {
            identifier: request.identifier,
            origin: raw.origin(),
            byte_len: raw.len(),
            modern,
            legacy,
        })
    }
}

/// 同一份字节，两次独立解码：每个后端一份帧数据。
fn decode_twice(
    raw: &RawImageBytes,
    limits: &DecodeLimits,
) -> Result<(DecodedFrame, DecodedFrame), DecodeError> {
    let modern = decode_frame(raw, limits)?;
    let legacy = decode_frame(raw, limits)?;
    Ok((modern, legacy))
}
