//! # 解码与规范化流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → 32bpp 预乘 BGRA”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做签名与尺寸检查，再进行完整解码，降低异常输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 文件签名探测，拒绝明显不是图片的内容
//! 2. 在独立的内存流视图上猜测格式并读取 header 尺寸
//! 3. 按像素上限快速拒绝
//! 4. 完整解码首帧（多帧容器只取第 0 帧）
//! 5. 转换为 BGRA 并预乘 alpha，校验字节长度一致性
//!
//! 每个后端调用一次 `decode_frame`，各自打开新的流视图；
//! 中间对象全部由作用域管理，任一阶段失败都只释放已创建的部分。

use std::io::Cursor;

use image::{GenericImageView, ImageReader};

use super::source::{DecodedFrame, RawImageBytes};
use super::DecodeError;
use crate::config::ViewerConfig;
use crate::render::Painter;

/// 解码资源上限。
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::from(&ViewerConfig::default())
    }
}

impl From<&ViewerConfig> for DecodeLimits {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            max_decoded_pixels: config.max_decoded_pixels,
        }
    }
}

/// 将原始字节解码为规范化帧。
pub fn decode_frame(raw: &RawImageBytes, limits: &DecodeLimits) -> Result<DecodedFrame, DecodeError> {
    validate_image_signature(raw.as_slice())?;

    let (header_width, header_height) = inspect_dimensions_from_memory(raw.as_slice())?;
    validate_pixel_limits(limits, header_width, header_height)?;

    let reader = ImageReader::new(Cursor::new(raw.as_slice()))
        .with_guessed_format()
        .map_err(|e| DecodeError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

    let decoded = reader
        .decode()
        .map_err(|e| DecodeError::Decode(format!("图片解码失败：{}", e)))?;

    let (width, height) = decoded.dimensions();
    validate_pixel_limits(limits, width, height)?;

    let mut pixels = decoded.to_rgba8().into_raw();
    rgba_to_premultiplied_bgra(&mut pixels);

    let frame = DecodedFrame::from_bgra_premultiplied(width, height, pixels)
        .ok_or_else(|| DecodeError::Decode("解码后像素数据长度异常".to_string()))?;

    log::debug!(
        "✅ 图片解码成功 - 来源: {} 尺寸: {}x{}",
        raw.origin().as_str(),
        width,
        height
    );

    Ok(frame)
}

/// 将规范化帧绑定到指定后端，得到后端原生位图。
///
/// 两个后端走同一条泛型路径，只是 `P::Bitmap` 不同。
pub fn materialize<P: Painter>(painter: &mut P, frame: &DecodedFrame) -> Result<P::Bitmap, DecodeError> {
    painter.create_bitmap(frame)
}

/// 通过文件签名（magic bytes）校验输入。
///
/// 能识别出是“非图片类型”时直接拒绝；无法识别的交给解码器最终判定。
fn validate_image_signature(bytes: &[u8]) -> Result<(), DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::InvalidFormat("图片内容为空".to_string()));
    }

    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(DecodeError::InvalidFormat(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }
    }

    Ok(())
}

/// 仅通过内存中的图片头信息读取宽高。
fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat("无法识别图片格式".to_string()));
    }

    reader
        .into_dimensions()
        .map_err(|e| DecodeError::InvalidFormat(format!("无法读取图片尺寸：{}", e)))
}

/// 校验像素数量是否超过上限。
fn validate_pixel_limits(limits: &DecodeLimits, width: u32, height: u32) -> Result<(), DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidFormat(format!(
            "图片尺寸无效：{}x{}",
            width, height
        )));
    }

    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| DecodeError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > limits.max_decoded_pixels {
        return Err(DecodeError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, limits.max_decoded_pixels
        )));
    }

    Ok(())
}

/// 原地将 RGBA 直通 alpha 转换为 BGRA 预乘 alpha。不做抖动。
fn rgba_to_premultiplied_bgra(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        let alpha = px[3] as u32;
        let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
        px[0] = premultiply(b, alpha);
        px[1] = premultiply(g, alpha);
        px[2] = premultiply(r, alpha);
    }
}

fn premultiply(channel: u32, alpha: u32) -> u8 {
    ((channel * alpha + 127) / 255) as u8
}
