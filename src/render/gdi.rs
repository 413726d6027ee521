//! # GDI 渲染后端（传统位图 API）
//!
//! ## 设计思路
//!
//! 渲染表面是一块与窗口兼容的内存 DC + 后备位图（双缓冲）；
//! 原生位图是 32bpp 自顶向下的 DIB section，直接拷入规范化的 BGRA 预乘像素。
//! 呈现时先在后备缓冲上清白、`AlphaBlend` 拉伸铺满，再整体 `BitBlt` 到窗口。
//!
//! ## 实现思路
//!
//! 每个 GDI 句柄都由一个小的守卫类型持有，在 `Drop` 中恢复选择并释放，
//! 任一步失败都只释放已经创建的句柄。

use std::ffi::c_void;
use std::mem::size_of;
use std::ptr::{copy_nonoverlapping, null_mut};

use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::Graphics::Gdi::{
    AC_SRC_ALPHA, AC_SRC_OVER, AlphaBlend, BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BLENDFUNCTION,
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, CreateDIBSection, DIB_RGB_COLORS,
    DeleteDC, DeleteObject, FillRect, GetDC, GetStockObject, HBITMAP, HBRUSH, HDC, HGDIOBJ,
    ReleaseDC, SRCCOPY, SelectObject, WHITE_BRUSH,
};
use windows::Win32::UI::WindowsAndMessaging::GetClientRect;

use super::geometry::{SurfaceSize, drawable_area, stretch_to_fill};
use super::{Backend, Painter, PresentOutcome, SurfaceError, SurfaceId};
use crate::image_pipeline::{DecodeError, DecodedFrame};

/// GDI 原生位图（DIB section），drop 时 `DeleteObject`。
pub struct GdiBitmap {
    handle: HBITMAP,
    width: u32,
    height: u32,
}

impl Drop for GdiBitmap {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteObject(self.handle.into());
        }
    }
}

/// 内存 DC 守卫：drop 时恢复原先选入的对象并删除 DC。
struct MemoryDc {
    dc: HDC,
    previous: Option<HGDIOBJ>,
}

impl MemoryDc {
    fn compatible_with(dc: Option<HDC>) -> Result<Self, String> {
        let dc = unsafe { CreateCompatibleDC(dc) };
        if dc.is_invalid() {
            return Err("CreateCompatibleDC 返回空句柄".to_string());
        }
        Ok(Self { dc, previous: None })
    }

    fn select(&mut self, object: HGDIOBJ) {
        let previous = unsafe { SelectObject(self.dc, object) };
        if self.previous.is_none() {
            self.previous = Some(previous);
        }
    }
}

impl Drop for MemoryDc {
    fn drop(&mut self) {
        unsafe {
            if let Some(previous) = self.previous.take() {
                SelectObject(self.dc, previous);
            }
            let _ = DeleteDC(self.dc);
        }
    }
}

/// 窗口 DC 守卫：drop 时 `ReleaseDC`。
struct WindowDc {
    hwnd: HWND,
    dc: HDC,
}

impl WindowDc {
    fn get(hwnd: HWND) -> Result<Self, String> {
        let dc = unsafe { GetDC(Some(hwnd)) };
        if dc.is_invalid() {
            return Err("GetDC 返回空句柄".to_string());
        }
        Ok(Self { hwnd, dc })
    }
}

impl Drop for WindowDc {
    fn drop(&mut self) {
        unsafe {
            ReleaseDC(Some(self.hwnd), self.dc);
        }
    }
}

/// 后备缓冲：内存 DC + 兼容位图。drop 时先恢复选择、删除位图，再由 `MemoryDc` 删除 DC。
struct BackBuffer {
    id: SurfaceId,
    size: SurfaceSize,
    memory: MemoryDc,
    bitmap: HBITMAP,
}

impl BackBuffer {
    fn create(hwnd: HWND, id: SurfaceId, size: SurfaceSize) -> Result<Self, String> {
        let window = WindowDc::get(hwnd)?;
        let mut memory = MemoryDc::compatible_with(Some(window.dc))?;

        let bitmap = unsafe {
            CreateCompatibleBitmap(window.dc, size.width.max(1) as i32, size.height.max(1) as i32)
        };
        if bitmap.is_invalid() {
            return Err("CreateCompatibleBitmap 返回空句柄".to_string());
        }
        memory.select(bitmap.into());

        Ok(Self {
            id,
            size,
            memory,
            bitmap,
        })
    }
}

impl Drop for BackBuffer {
    fn drop(&mut self) {
        if let Some(previous) = self.memory.previous.take() {
            unsafe {
                SelectObject(self.memory.dc, previous);
            }
        }
        unsafe {
            let _ = DeleteObject(self.bitmap.into());
        }
    }
}

pub struct GdiPainter {
    hwnd: HWND,
    buffer: Option<BackBuffer>,
    next_surface_id: u64,
}

impl GdiPainter {
    pub fn new(hwnd: HWND) -> Self {
        Self {
            hwnd,
            buffer: None,
            next_surface_id: 1,
        }
    }

    fn client_size(&self) -> SurfaceSize {
        let mut rc = RECT::default();
        if unsafe { GetClientRect(self.hwnd, &mut rc) }.is_err() {
            return SurfaceSize::default();
        }
        SurfaceSize::from_client_rect(rc.left, rc.top, rc.right, rc.bottom)
    }
}

impl Painter for GdiPainter {
    type Bitmap = GdiBitmap;

    fn backend(&self) -> Backend {
        Backend::Legacy
    }

    fn ensure_surface(&mut self) -> Result<SurfaceId, SurfaceError> {
        if let Some(buffer) = &self.buffer {
            return Ok(buffer.id);
        }

        let id = SurfaceId(self.next_surface_id);
        let size = self.client_size();
        let buffer = BackBuffer::create(self.hwnd, id, size).map_err(SurfaceError::Create)?;
        self.next_surface_id += 1;
        self.buffer = Some(buffer);

        log::debug!("🖼️ 创建 GDI 后备缓冲 - size={}x{} id={}", size.width, size.height, id.0);
        Ok(id)
    }

    fn has_surface(&self) -> bool {
        self.buffer.is_some()
    }

    fn surface_size(&self) -> Option<SurfaceSize> {
        self.buffer.as_ref().map(|buffer| buffer.size)
    }

    fn resize(&mut self, size: SurfaceSize) -> Result<(), SurfaceError> {
        let id = self.buffer.as_ref().map(|buffer| buffer.id).ok_or(SurfaceError::Missing)?;
        // 先释放旧缓冲再创建新缓冲，标识保持不变
        self.buffer = None;
        let buffer = BackBuffer::create(self.hwnd, id, size).map_err(SurfaceError::Resize)?;
        self.buffer = Some(buffer);
        Ok(())
    }

    fn create_bitmap(&mut self, frame: &DecodedFrame) -> Result<GdiBitmap, DecodeError> {
        let (width, height) = frame.dimensions();
        let mut info = BITMAPINFO::default();
        info.bmiHeader = BITMAPINFOHEADER {
            biSize: size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width as i32,
            biHeight: -(height as i32),
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        };

        let mut bits: *mut c_void = null_mut();
        let handle = unsafe { CreateDIBSection(None, &info, DIB_RGB_COLORS, &mut bits, None, 0) }
            .map_err(|e| DecodeError::Materialize(format!("CreateDIBSection 失败：{}", e)))?;
        let bitmap = GdiBitmap {
            handle,
            width,
            height,
        };

        if bits.is_null() {
            return Err(DecodeError::Materialize("DIB section 像素指针为空".to_string()));
        }

        let pixels = frame.pixels();
        unsafe {
            copy_nonoverlapping(pixels.as_ptr(), bits as *mut u8, pixels.len());
        }

        Ok(bitmap)
    }

    fn present(&mut self, bitmap: Option<&GdiBitmap>) -> Result<PresentOutcome, SurfaceError> {
        let buffer = self.buffer.as_ref().ok_or(SurfaceError::Missing)?;
        let dest = stretch_to_fill(buffer.size);
        let (width, height) = (dest.width() as i32, dest.height() as i32);
        let rect = RECT {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        };

        unsafe {
            FillRect(buffer.memory.dc, &rect, HBRUSH(GetStockObject(WHITE_BRUSH).0));
        }

        // 最小化等情况下客户区为 0×N，后备缓冲按 1×1 创建，此时只清屏
        if let (Some(bitmap), Some(_)) = (bitmap, drawable_area(buffer.size)) {
            let mut source = MemoryDc::compatible_with(Some(buffer.memory.dc)).map_err(SurfaceError::Draw)?;
            source.select(bitmap.handle.into());

            let blend = BLENDFUNCTION {
                BlendOp: AC_SRC_OVER as u8,
                BlendFlags: 0,
                SourceConstantAlpha: 255,
                AlphaFormat: AC_SRC_ALPHA as u8,
            };
            let blended = unsafe {
                AlphaBlend(
                    buffer.memory.dc,
                    0,
                    0,
                    width,
                    height,
                    source.dc,
                    0,
                    0,
                    bitmap.width as i32,
                    bitmap.height as i32,
                    blend,
                )
            };
            if !blended.as_bool() {
                return Err(SurfaceError::Draw("AlphaBlend 失败".to_string()));
            }
        }

        let window = WindowDc::get(self.hwnd).map_err(SurfaceError::Draw)?;
        unsafe {
            BitBlt(window.dc, 0, 0, width, height, Some(buffer.memory.dc), 0, 0, SRCCOPY)
        }
        .map_err(|e| SurfaceError::Draw(format!("BitBlt 失败：{}", e)))?;

        Ok(PresentOutcome::Presented)
    }

    fn release_surface(&mut self) {
        self.buffer = None;
    }
}
