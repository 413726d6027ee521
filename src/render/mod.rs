//! # 渲染模块（render）
//!
//! ## 设计思路
//!
//! 两套渲染后端（Direct2D / GDI）的原生位图类型互不兼容，因此用带关联类型的
//! `Painter` trait 统一“表面管理 + 位图创建 + 呈现”三件事，
//! 应用状态层只面向该 trait 编程，不直接接触任何平台句柄。
//!
//! - `geometry`：纯几何计算（拉伸目标矩形、采样映射），可直接单元测试
//! - `software`：CPU 帧缓冲实现，用于测试与非 Windows 平台
//! - `direct2d` / `gdi`：Windows 原生实现
//!
//! ## 表面生命周期
//!
//! ```text
//! ensure_surface（幂等） → resize* → present* → release_surface
//!          ↑                              │
//!          └──────── DeviceLost ──────────┘
//! ```

pub mod geometry;
pub mod software;

#[cfg(windows)]
pub mod direct2d;
#[cfg(windows)]
pub mod gdi;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::image_pipeline::{DecodeError, DecodedFrame};

pub use geometry::SurfaceSize;
pub use software::{SoftwareBitmap, SoftwarePainter};

/// 渲染后端。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// 现代保留模式 2D API（Direct2D）。
    Modern,
    /// 传统位图 API（GDI）。
    Legacy,
}

impl Backend {
    pub fn toggled(self) -> Self {
        match self {
            Self::Modern => Self::Legacy,
            Self::Legacy => Self::Modern,
        }
    }

    /// 标题栏展示名。
    pub fn label(self) -> &'static str {
        match self {
            Self::Modern => "Direct2D",
            Self::Legacy => "GDI",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 渲染表面标识。只在表面被（重新）创建时变化。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

/// 渲染表面错误。
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("渲染表面尚未创建")]
    Missing,

    #[error("创建渲染表面失败：{0}")]
    Create(String),

    #[error("调整渲染表面尺寸失败：{0}")]
    Resize(String),

    #[error("绘制失败：{0}")]
    Draw(String),
}

/// 一次呈现的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// 设备丢失：表面及依附于设备的位图已丢弃，下次 `ensure_surface` 会重建。
    DeviceLost,
}

/// 渲染后端统一接口。
///
/// 所有方法只在 UI 线程调用。
pub trait Painter {
    /// 后端原生位图类型。
    type Bitmap;

    fn backend(&self) -> Backend;

    /// 确保渲染表面存在（幂等）：已存在则原样返回，否则按当前客户区尺寸创建。
    fn ensure_surface(&mut self) -> Result<SurfaceId, SurfaceError>;

    /// 是否已持有渲染表面。
    fn has_surface(&self) -> bool;

    /// 当前表面尺寸；没有表面时为 `None`。
    fn surface_size(&self) -> Option<SurfaceSize>;

    /// 调整已有表面尺寸；没有表面时返回 `SurfaceError::Missing`。
    fn resize(&mut self, size: SurfaceSize) -> Result<(), SurfaceError>;

    /// 记录窗口客户区尺寸（尚无表面时调用）。能直接查询窗口的实现无需覆盖。
    fn set_client_size(&mut self, _size: SurfaceSize) {}

    /// 将规范化帧绑定为后端原生位图。
    fn create_bitmap(&mut self, frame: &DecodedFrame) -> Result<Self::Bitmap, DecodeError>;

    /// 清屏为白色，并将位图拉伸铺满整个表面（不保持宽高比）。
    fn present(&mut self, bitmap: Option<&Self::Bitmap>) -> Result<PresentOutcome, SurfaceError>;

    /// 释放渲染表面。
    fn release_surface(&mut self);
}

/// 清屏背景色（BGRA 预乘，白色不透明）。
pub const BACKGROUND_BGRA: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
