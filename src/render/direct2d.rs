//! # Direct2D 渲染后端（现代保留模式 API）
//!
//! ## 设计思路
//!
//! 与窗口绑定的 `ID2D1HwndRenderTarget` 作为渲染表面，位图通过
//! `CreateBitmap` 从规范化的 BGRA 预乘像素直接创建（像素格式与 D2D 期望一致，无需再转换）。
//!
//! ## 实现思路
//!
//! - COM 接口由 `windows` crate 在 drop 时自动 `Release`，任何失败路径都不会泄漏。
//! - `EndDraw` 返回 `D2DERR_RECREATE_TARGET` 时丢弃渲染目标；依附于它的位图也随之失效，
//!   由上层在下次绘制时重新绑定。

use std::ffi::c_void;

use windows::Win32::Foundation::{D2DERR_RECREATE_TARGET, HWND, RECT};
use windows::Win32::Graphics::Direct2D::Common::{
    D2D_RECT_F, D2D_SIZE_U, D2D1_ALPHA_MODE_PREMULTIPLIED, D2D1_COLOR_F, D2D1_PIXEL_FORMAT,
};
use windows::Win32::Graphics::Direct2D::{
    D2D1_BITMAP_INTERPOLATION_MODE_LINEAR, D2D1_BITMAP_PROPERTIES,
    D2D1_FACTORY_TYPE_SINGLE_THREADED, D2D1_HWND_RENDER_TARGET_PROPERTIES,
    D2D1_PRESENT_OPTIONS_NONE, D2D1_RENDER_TARGET_PROPERTIES, D2D1CreateFactory, ID2D1Bitmap,
    ID2D1Factory, ID2D1HwndRenderTarget,
};
use windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT_B8G8R8A8_UNORM;
use windows::Win32::UI::WindowsAndMessaging::GetClientRect;

use super::geometry::{DestinationRect, SurfaceSize};
use super::{Backend, Painter, PresentOutcome, SurfaceError, SurfaceId};
use crate::image_pipeline::{DecodeError, DecodedFrame};

/// Direct2D 原生位图（依附于创建它的渲染目标）。
pub struct Direct2dBitmap(ID2D1Bitmap);

struct RenderTarget {
    id: SurfaceId,
    size: SurfaceSize,
    target: ID2D1HwndRenderTarget,
}

pub struct Direct2dPainter {
    hwnd: HWND,
    factory: ID2D1Factory,
    target: Option<RenderTarget>,
    next_surface_id: u64,
}

impl Direct2dPainter {
    pub fn new(hwnd: HWND) -> Result<Self, SurfaceError> {
        let factory: ID2D1Factory =
            unsafe { D2D1CreateFactory(D2D1_FACTORY_TYPE_SINGLE_THREADED, None) }
                .map_err(|e| SurfaceError::Create(format!("D2D1CreateFactory 失败：{}", e)))?;

        Ok(Self {
            hwnd,
            factory,
            target: None,
            next_surface_id: 1,
        })
    }

    fn client_size(&self) -> SurfaceSize {
        let mut rc = RECT::default();
        if unsafe { GetClientRect(self.hwnd, &mut rc) }.is_err() {
            return SurfaceSize::default();
        }
        SurfaceSize::from_client_rect(rc.left, rc.top, rc.right, rc.bottom)
    }
}

impl Painter for Direct2dPainter {
    type Bitmap = Direct2dBitmap;

    fn backend(&self) -> Backend {
        Backend::Modern
    }

    fn ensure_surface(&mut self) -> Result<SurfaceId, SurfaceError> {
        if let Some(target) = &self.target {
            return Ok(target.id);
        }

        let size = self.client_size();
        let hwnd_props = D2D1_HWND_RENDER_TARGET_PROPERTIES {
            hwnd: self.hwnd,
            pixelSize: D2D_SIZE_U {
                width: size.width,
                height: size.height,
            },
            presentOptions: D2D1_PRESENT_OPTIONS_NONE,
        };

        let target = unsafe {
            self.factory
                .CreateHwndRenderTarget(&D2D1_RENDER_TARGET_PROPERTIES::default(), &hwnd_props)
        }
        .map_err(|e| SurfaceError::Create(format!("CreateHwndRenderTarget 失败：{}", e)))?;

        let id = SurfaceId(self.next_surface_id);
        self.next_surface_id += 1;
        self.target = Some(RenderTarget { id, size, target });

        log::debug!("🖼️ 创建 Direct2D 渲染目标 - size={}x{} id={}", size.width, size.height, id.0);
        Ok(id)
    }

    fn has_surface(&self) -> bool {
        self.target.is_some()
    }

    fn surface_size(&self) -> Option<SurfaceSize> {
        self.target.as_ref().map(|target| target.size)
    }

    fn resize(&mut self, size: SurfaceSize) -> Result<(), SurfaceError> {
        let target = self.target.as_mut().ok_or(SurfaceError::Missing)?;
        unsafe {
            target.target.Resize(&D2D_SIZE_U {
                width: size.width,
                height: size.height,
            })
        }
        .map_err(|e| SurfaceError::Resize(format!("ID2D1HwndRenderTarget::Resize 失败：{}", e)))?;
        target.size = size;
        Ok(())
    }

    fn create_bitmap(&mut self, frame: &DecodedFrame) -> Result<Direct2dBitmap, DecodeError> {
        self.ensure_surface()
            .map_err(|e| DecodeError::Materialize(e.to_string()))?;
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| DecodeError::Materialize("Direct2D 渲染目标不可用".to_string()))?;

        let props = D2D1_BITMAP_PROPERTIES {
            pixelFormat: D2D1_PIXEL_FORMAT {
                format: DXGI_FORMAT_B8G8R8A8_UNORM,
                alphaMode: D2D1_ALPHA_MODE_PREMULTIPLIED,
            },
            dpiX: 96.0,
            dpiY: 96.0,
        };

        let bitmap = unsafe {
            target.target.CreateBitmap(
                D2D_SIZE_U {
                    width: frame.width(),
                    height: frame.height(),
                },
                Some(frame.pixels().as_ptr() as *const c_void),
                frame.stride() as u32,
                &props,
            )
        }
        .map_err(|e| DecodeError::Materialize(format!("ID2D1RenderTarget::CreateBitmap 失败：{}", e)))?;

        Ok(Direct2dBitmap(bitmap))
    }

    fn present(&mut self, bitmap: Option<&Direct2dBitmap>) -> Result<PresentOutcome, SurfaceError> {
        let target = self.target.as_ref().ok_or(SurfaceError::Missing)?;
        let white = D2D1_COLOR_F {
            r: 1.0,
            g: 1.0,
            b: 1.0,
            a: 1.0,
        };

        let end_draw = unsafe {
            target.target.BeginDraw();
            target.target.Clear(Some(&white as *const _));

            if let Some(bitmap) = bitmap {
                let size = target.target.GetSize();
                let dest = DestinationRect::covering(size.width, size.height);
                let rect = D2D_RECT_F {
                    left: dest.left,
                    top: dest.top,
                    right: dest.right,
                    bottom: dest.bottom,
                };
                target.target.DrawBitmap(
                    &bitmap.0,
                    Some(&rect as *const _),
                    1.0,
                    D2D1_BITMAP_INTERPOLATION_MODE_LINEAR,
                    None,
                );
            }

            target.target.EndDraw(None, None)
        };

        match end_draw {
            Ok(()) => Ok(PresentOutcome::Presented),
            Err(err) if err.code() == D2DERR_RECREATE_TARGET => {
                self.target = None;
                Ok(PresentOutcome::DeviceLost)
            }
            Err(err) => Err(SurfaceError::Draw(format!("EndDraw 失败：{}", err))),
        }
    }

    fn release_surface(&mut self) {
        self.target = None;
    }
}
