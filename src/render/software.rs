//! # CPU 软件渲染后端
//!
//! ## 设计思路
//!
//! 用一块内存中的 BGRA 预乘帧缓冲模拟窗口渲染表面，行为与两个原生后端保持一致：
//! 清屏为白色、位图拉伸铺满、预乘 alpha 的 source-over 混合。
//! 主要用于测试（无需窗口即可验证加载/呈现语义），也可作为非 Windows 平台的实现。
//!
//! ## 实现思路
//!
//! - 拉伸使用 `fast_image_resize` 双线性卷积；失败时回退最近邻采样。
//! - 数据已是预乘格式，缩放时关闭 alpha 乘除，避免二次预乘。
//! - 记录表面创建、位图创建与呈现次数，便于断言“没有重复解码”。

use fast_image_resize as fr;

use super::geometry::{SurfaceSize, drawable_area, nearest_source_index};
use super::{BACKGROUND_BGRA, Backend, Painter, PresentOutcome, SurfaceError, SurfaceId};
use crate::image_pipeline::{DecodeError, DecodedFrame};

/// 软件后端位图：独立持有一份 BGRA 预乘像素。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareBitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl SoftwareBitmap {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Debug)]
struct SoftwareSurface {
    id: SurfaceId,
    size: SurfaceSize,
    pixels: Vec<u8>,
}

impl SoftwareSurface {
    fn new(id: SurfaceId, size: SurfaceSize) -> Self {
        Self {
            id,
            size,
            pixels: blank_buffer(size),
        }
    }
}

/// CPU 帧缓冲渲染器。
#[derive(Debug)]
pub struct SoftwarePainter {
    backend: Backend,
    client_size: SurfaceSize,
    surface: Option<SoftwareSurface>,
    next_surface_id: u64,
    bitmaps_created: usize,
    presents: usize,
}

impl SoftwarePainter {
    /// `client_size` 为“窗口客户区”尺寸，首次创建表面时使用。
    pub fn new(backend: Backend, client_size: SurfaceSize) -> Self {
        Self {
            backend,
            client_size,
            surface: None,
            next_surface_id: 1,
            bitmaps_created: 0,
            presents: 0,
        }
    }

    /// 当前帧缓冲内容。
    pub fn pixels(&self) -> Option<&[u8]> {
        self.surface.as_ref().map(|surface| surface.pixels.as_slice())
    }

    /// 读取表面上某个像素（BGRA 预乘）。
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let surface = self.surface.as_ref()?;
        if x >= surface.size.width || y >= surface.size.height {
            return None;
        }
        let offset = (y as usize * surface.size.width as usize + x as usize) * 4;
        let px = surface.pixels.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// 已创建的原生位图数量（每次解码绑定计一次）。
    pub fn bitmaps_created(&self) -> usize {
        self.bitmaps_created
    }

    pub fn present_count(&self) -> usize {
        self.presents
    }
}

impl Painter for SoftwarePainter {
    type Bitmap = SoftwareBitmap;

    fn backend(&self) -> Backend {
        self.backend
    }

    fn ensure_surface(&mut self) -> Result<SurfaceId, SurfaceError> {
        if let Some(surface) = &self.surface {
            return Ok(surface.id);
        }

        let id = SurfaceId(self.next_surface_id);
        self.next_surface_id += 1;
        self.surface = Some(SoftwareSurface::new(id, self.client_size));

        log::debug!(
            "🖼️ 创建软件渲染表面 - backend={} size={}x{} id={}",
            self.backend,
            self.client_size.width,
            self.client_size.height,
            id.0
        );
        Ok(id)
    }

    fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    fn surface_size(&self) -> Option<SurfaceSize> {
        self.surface.as_ref().map(|surface| surface.size)
    }

    fn resize(&mut self, size: SurfaceSize) -> Result<(), SurfaceError> {
        let surface = self.surface.as_mut().ok_or(SurfaceError::Missing)?;
        surface.size = size;
        surface.pixels = blank_buffer(size);
        self.client_size = size;
        Ok(())
    }

    fn set_client_size(&mut self, size: SurfaceSize) {
        self.client_size = size;
    }

    fn create_bitmap(&mut self, frame: &DecodedFrame) -> Result<SoftwareBitmap, DecodeError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::Materialize(format!(
                "位图尺寸无效：{}x{}",
                width, height
            )));
        }

        self.bitmaps_created += 1;
        Ok(SoftwareBitmap {
            width,
            height,
            pixels: frame.pixels().to_vec(),
        })
    }

    fn present(&mut self, bitmap: Option<&SoftwareBitmap>) -> Result<PresentOutcome, SurfaceError> {
        let surface = self.surface.as_mut().ok_or(SurfaceError::Missing)?;

        for px in surface.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&BACKGROUND_BGRA);
        }

        if let Some(bitmap) = bitmap {
            if drawable_area(surface.size).is_some() {
                let stretched = stretch_pixels(bitmap, surface.size);
                blend_over(&mut surface.pixels, &stretched);
            }
        }

        self.presents += 1;
        Ok(PresentOutcome::Presented)
    }

    fn release_surface(&mut self) {
        self.surface = None;
    }
}

fn blank_buffer(size: SurfaceSize) -> Vec<u8> {
    let len = size.width as usize * size.height as usize;
    BACKGROUND_BGRA.repeat(len)
}

/// 将位图拉伸到表面尺寸。
fn stretch_pixels(bitmap: &SoftwareBitmap, target: SurfaceSize) -> Vec<u8> {
    if bitmap.dimensions() == (target.width, target.height) {
        return bitmap.pixels.clone();
    }

    match resize_with_fast_image_resize(bitmap, target) {
        Ok(pixels) => pixels,
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 拉伸失败，回退最近邻采样：{}", err);
            resize_nearest(bitmap, target)
        }
    }
}

fn resize_with_fast_image_resize(
    bitmap: &SoftwareBitmap,
    target: SurfaceSize,
) -> Result<Vec<u8>, String> {
    let src_image = fr::images::Image::from_vec_u8(
        bitmap.width,
        bitmap.height,
        bitmap.pixels.clone(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| format!("构建源图像缓冲失败：{}", e))?;

    let mut dst_image = fr::images::Image::new(target.width, target.height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear))
        .use_alpha(false);

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| format!("fast_image_resize 执行失败：{}", e))?;

    Ok(dst_image.into_vec())
}

fn resize_nearest(bitmap: &SoftwareBitmap, target: SurfaceSize) -> Vec<u8> {
    let mut out = Vec::with_capacity(target.width as usize * target.height as usize * 4);
    for y in 0..target.height {
        let sy = nearest_source_index(y, target.height, bitmap.height);
        for x in 0..target.width {
            let sx = nearest_source_index(x, target.width, bitmap.width);
            let offset = (sy as usize * bitmap.width as usize + sx as usize) * 4;
            out.extend_from_slice(&bitmap.pixels[offset..offset + 4]);
        }
    }
    out
}

/// 预乘 alpha 的 source-over：`dst = src + dst * (1 - src_a)`。
fn blend_over(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let inverse_alpha = 255 - s[3] as u32;
        for channel in 0..4 {
            let value = s[channel] as u32 + (d[channel] as u32 * inverse_alpha + 127) / 255;
            d[channel] = value.min(255) as u8;
        }
    }
}
