//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 各阶段错误（取字节 / 解码 / 渲染表面）在发生处就地处理：中止本次操作、保持原状态。
//! 只有启动阶段的失败（配置、窗口类注册、运行时创建）才上抛到 `main`，由 `AppError` 汇总。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为各模块错误提供 `From` 转换，调用处直接 `?`。

use crate::config::ConfigError;
use crate::image_pipeline::{FetchError, LoadError};
use crate::render::SurfaceError;

/// 应用级统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 配置文件读取或校验失败
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// 图片加载链路错误
    #[error("{0}")]
    Load(#[from] LoadError),

    /// 渲染表面错误
    #[error("{0}")]
    Surface(#[from] SurfaceError),

    /// 文件系统 / 运行时 I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 窗口创建或消息循环失败
    #[error("窗口操作失败: {0}")]
    Window(String),
}

impl From<FetchError> for AppError {
    fn from(error: FetchError) -> Self {
        Self::Load(LoadError::Fetch(error))
    }
}
