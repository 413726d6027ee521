//! 后端位图槽
//!
//! 每个后端一个槽：持有该后端的渲染器、解码帧与原生位图。
//! 解码帧保留在槽内，设备丢失导致原生位图失效时可以直接重新绑定，无需重新获取或解码。

use crate::image_pipeline::{DecodeError, DecodedFrame, materialize};
use crate::render::{Painter, PresentOutcome, SurfaceError, SurfaceSize};

pub struct BackendSlot<P: Painter> {
    painter: P,
    frame: Option<DecodedFrame>,
    bitmap: Option<P::Bitmap>,
}

impl<P: Painter> BackendSlot<P> {
    pub fn new(painter: P) -> Self {
        Self {
            painter,
            frame: None,
            bitmap: None,
        }
    }

    pub fn painter(&self) -> &P {
        &self.painter
    }

    pub fn painter_mut(&mut self) -> &mut P {
        &mut self.painter
    }

    pub fn frame(&self) -> Option<&DecodedFrame> {
        self.frame.as_ref()
    }

    pub fn bitmap(&self) -> Option<&P::Bitmap> {
        self.bitmap.as_ref()
    }

    /// 为新帧创建原生位图，但不替换当前内容。
    pub(crate) fn prepare(&mut self, frame: &DecodedFrame) -> Result<P::Bitmap, DecodeError> {
        materialize(&mut self.painter, frame)
    }

    /// 用新帧与新位图整体替换旧内容；旧位图随之释放。
    pub(crate) fn install(&mut self, frame: DecodedFrame, bitmap: P::Bitmap) {
        self.frame = Some(frame);
        self.bitmap = Some(bitmap);
    }

    /// 窗口客户区尺寸变化：已有表面就地调整，否则只记录尺寸。
    pub(crate) fn resize(&mut self, size: SurfaceSize) -> Result<(), SurfaceError> {
        if self.painter.has_surface() {
            self.painter.resize(size)
        } else {
            self.painter.set_client_size(size);
            Ok(())
        }
    }

    /// 绘制当前位图。
    pub(crate) fn paint(&mut self) -> Result<PresentOutcome, SurfaceError> {
        self.painter.ensure_surface()?;

        if self.bitmap.is_none() {
            if let Some(frame) = &self.frame {
                match materialize(&mut self.painter, frame) {
                    Ok(bitmap) => self.bitmap = Some(bitmap),
                    Err(err) => log::warn!("⚠️ 重新绑定位图失败 - backend={} 原因: {}", self.painter.backend(), err),
                }
            }
        }

        let outcome = self.painter.present(self.bitmap.as_ref())?;
        if outcome == PresentOutcome::DeviceLost {
            log::warn!("⚠️ 渲染设备丢失，下次绘制时重建表面 - backend={}", self.painter.backend());
            self.bitmap = None;
        }
        Ok(outcome)
    }
}
