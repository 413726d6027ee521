//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入”和“流水线中间结果”解耦：
//! - `ImageId` 表示要加载哪一张图
//! - `RawImageBytes` 表示已获取但未解码的字节（不可变，可被多个流视图共享）
//! - `DecodedFrame` 表示规范化后的 32bpp 预乘 BGRA 像素
//! - `LoadRequest` / `LoadOutcome` 表示一次加载的请求与结果

use std::fmt;

use bytes::Bytes;
use rand::Rng;

use super::{IdentifierError, LoadError};

/// 图片编号（正整数）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(u32);

impl ImageId {
    pub const MIN: Self = Self(1);

    /// 构造编号；`0` 不是合法编号。
    pub fn new(value: u32) -> Option<Self> {
        (value >= 1).then_some(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// 解析并校验用户输入的编号（数字输入框的校验逻辑）。
    ///
    /// # 示例
    /// ```rust
    /// use cat_viewer::image_pipeline::ImageId;
    ///
    /// let id = ImageId::parse_in_range(" 42 ", 640)?;
    /// assert_eq!(id.get(), 42);
    /// # Ok::<(), cat_viewer::image_pipeline::IdentifierError>(())
    /// ```
    pub fn parse_in_range(text: &str, max: u32) -> Result<Self, IdentifierError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let value: u64 = trimmed
            .parse()
            .map_err(|_| IdentifierError::NotANumber(trimmed.to_string()))?;

        if value == 0 || value > max as u64 {
            return Err(IdentifierError::OutOfRange { value, max });
        }

        Ok(Self(value as u32))
    }

    /// 在 `1..=max` 内随机选一个编号。
    pub fn random(max: u32) -> Self {
        Self::random_with(&mut rand::rng(), max)
    }

    pub fn random_with<R: Rng + ?Sized>(rng: &mut R, max: u32) -> Self {
        Self(rng.random_range(1..=max.max(1)))
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 字节来源（用于日志与诊断）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrigin {
    Disk,
    Network,
}

impl ByteOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disk => "disk",
            Self::Network => "network",
        }
    }
}

/// 取字节阶段输出：不可变的编码图片字节。
///
/// 成功返回时一定非空。内部使用 `Bytes`，每次解码各自打开一个流视图，
/// 不会从一个已读尽的流上重复读取。
#[derive(Debug, Clone)]
pub struct RawImageBytes {
    bytes: Bytes,
    origin: ByteOrigin,
}

impl RawImageBytes {
    /// 空字节返回 `None`。
    pub fn new(bytes: impl Into<Bytes>, origin: ByteOrigin) -> Option<Self> {
        let bytes = bytes.into();
        (!bytes.is_empty()).then_some(Self { bytes, origin })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn origin(&self) -> ByteOrigin {
        self.origin
    }
}

/// 规范像素格式。当前只有一种。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32 位，B-G-R-A 通道顺序，alpha 预乘。
    Bgra8Premultiplied,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgra8Premultiplied => 4,
        }
    }
}

/// 解码阶段输出：与源图原始尺寸一致的规范化位图。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) stride: usize,
    pub(crate) pixels: Vec<u8>,
}

impl DecodedFrame {
    pub const FORMAT: PixelFormat = PixelFormat::Bgra8Premultiplied;

    /// 由已规范化的 BGRA 预乘像素构造；长度不匹配时返回 `None`。
    pub fn from_bgra_premultiplied(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let stride = (width as usize).checked_mul(Self::FORMAT.bytes_per_pixel())?;
        let expected = stride.checked_mul(height as usize)?;
        (expected == pixels.len()).then_some(Self {
            width,
            height,
            stride,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 每行字节数（`width * 4`）。
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn format(&self) -> PixelFormat {
        Self::FORMAT
    }
}

/// 一次加载请求。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    /// 单调递增的请求代号，只有最新一代的结果会被应用。
    pub generation: u64,
    pub identifier: ImageId,
    pub offline: bool,
}

/// 加载成功的产物：同一份字节独立解码两次，每个后端一份。
#[derive(Debug)]
pub struct LoadedImage {
    pub identifier: ImageId,
    pub origin: ByteOrigin,
    pub byte_len: usize,
    pub modern: DecodedFrame,
    pub legacy: DecodedFrame,
}

/// 一次加载的结果，交回 UI 线程应用。
#[derive(Debug)]
pub struct LoadOutcome {
    pub request: LoadRequest,
    pub result: Result<LoadedImage, LoadError>,
}
