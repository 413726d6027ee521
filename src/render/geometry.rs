//! 渲染几何计算
//!
//! # 设计思路
//!
//! 将“拉伸铺满”的坐标计算抽成不依赖任何平台句柄的纯函数：
//! 三个后端共用同一套目标矩形语义，几何规则也可以脱离窗口直接单元测试。
//!
//! # 实现思路
//!
//! - 目标矩形恒为整个表面 `(0, 0, width, height)`，宽高比不保留。
//! - 最近邻采样映射使用像素中心对齐，保证首尾像素都能命中。

/// 渲染表面尺寸（物理像素）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 由客户区矩形换算尺寸；负宽高（最小化等异常情况）收敛为 0。
    pub fn from_client_rect(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            width: right.saturating_sub(left).max(0) as u32,
            height: bottom.saturating_sub(top).max(0) as u32,
        }
    }

    /// 任一边为 0 时无可绘制区域。
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// 从 `WM_SIZE` 的 `lParam` 低/高 16 位解出客户区尺寸。
    pub fn from_size_lparam(lparam: isize) -> Self {
        Self {
            width: (lparam & 0xFFFF) as u32,
            height: ((lparam >> 16) & 0xFFFF) as u32,
        }
    }
}

/// 绘制目标矩形（浮点，与 Direct2D 的 `D2D_RECT_F` 对应）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DestinationRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl DestinationRect {
    /// 以原点为左上角、覆盖 `width × height` 的矩形。
    pub fn covering(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            right: width,
            bottom: height,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// 位图拉伸铺满整个表面时的目标矩形。
pub fn stretch_to_fill(surface: SurfaceSize) -> DestinationRect {
    DestinationRect::covering(surface.width as f32, surface.height as f32)
}

/// 可绘制区域：任一边为 0 时为 `None`，调用方应跳过位图绘制，只做清屏。
pub fn drawable_area(surface: SurfaceSize) -> Option<DestinationRect> {
    (!surface.is_empty()).then(|| stretch_to_fill(surface))
}

/// 最近邻采样：目标坐标 `dst`（共 `dst_len` 个像素）映射到源坐标（共 `src_len` 个像素）。
///
/// 调用方保证 `dst < dst_len` 且 `src_len > 0`。
pub fn nearest_source_index(dst: u32, dst_len: u32, src_len: u32) -> u32 {
    if dst_len == 0 || src_len == 0 {
        return 0;
    }
    let center = (dst as u64 * 2 + 1) * src_len as u64;
    let index = center / (dst_len as u64 * 2);
    (index as u32).min(src_len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn stretch_rect_covers_whole_surface() {
        let rect = stretch_to_fill(SurfaceSize::new(400, 300));

        assert_eq!(rect.left, 0.0);
        assert_eq!(rect.top, 0.0);
        assert_eq!(rect.width(), 400.0);
        assert_eq!(rect.height(), 300.0);
    }

    #[test]
    fn zero_extent_surface_has_no_drawable_area() {
        assert_eq!(drawable_area(SurfaceSize::new(0, 600)), None);
        assert_eq!(drawable_area(SurfaceSize::new(900, 0)), None);
        assert_eq!(
            drawable_area(SurfaceSize::new(900, 600)),
            Some(DestinationRect::covering(900.0, 600.0))
        );
    }

    #[test]
    fn client_rect_with_negative_extent_collapses_to_zero() {
        let size = SurfaceSize::from_client_rect(10, 10, 5, 40);

        assert_eq!(size, SurfaceSize::new(0, 30));
        assert!(size.is_empty());
    }

    #[test]
    fn size_lparam_splits_low_and_high_words() {
        let lparam = (300_isize << 16) | 400;

        assert_eq!(SurfaceSize::from_size_lparam(lparam), SurfaceSize::new(400, 300));
    }

    #[test]
    fn nearest_index_hits_first_and_last_pixel() {
        assert_eq!(nearest_source_index(0, 400, 100), 0);
        assert_eq!(nearest_source_index(399, 400, 100), 99);
        assert_eq!(nearest_source_index(0, 1, 7), 3);
    }

    proptest! {
        #[test]
        fn nearest_index_stays_in_bounds(dst_len in 1u32..4096, src_len in 1u32..4096, seed in 0u32..4096) {
            let dst = seed % dst_len;
            let index = nearest_source_index(dst, dst_len, src_len);
            prop_assert!(index < src_len);
        }

        #[test]
        fn nearest_index_is_monotonic(dst_len in 2u32..2048, src_len in 1u32..2048, seed in 0u32..2048) {
            let dst = seed % (dst_len - 1);
            prop_assert!(
                nearest_source_index(dst, dst_len, src_len)
                    <= nearest_source_index(dst + 1, dst_len, src_len)
            );
        }
    }
}
