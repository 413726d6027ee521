//! 应用视图状态
//!
//! `ViewState` 只由命令处理逻辑修改，由重绘逻辑读取。
//! `LoadTracker` 为每次加载分配单调递增的代号，实现“最后一次加载生效”。

use crate::image_pipeline::ImageId;
use crate::render::Backend;

/// 视图状态：离线开关、当前后端、当前显示的编号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub offline: bool,
    pub backend: Backend,
    /// 当前已成功显示的编号；加载失败时保持不变。
    pub current: ImageId,
}

impl ViewState {
    /// 标题栏文本，例如 `Gary Viewer - #7 [Direct2D] (offline)`。
    pub fn title(&self) -> String {
        let mut title = format!("Gary Viewer - #{} [{}]", self.current, self.backend);
        if self.offline {
            title.push_str(" (offline)");
        }
        title
    }
}

/// 加载阶段：`Idle → Loading → {Loaded, FailedNoChange}`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading { generation: u64 },
    Loaded,
    FailedNoChange,
}

/// 加载代号分配器。
#[derive(Debug, Default)]
pub struct LoadTracker {
    last_issued: u64,
    in_flight: Option<u64>,
}

impl LoadTracker {
    /// 发起新加载，之前未完成的加载自动作废。
    pub fn begin(&mut self) -> u64 {
        self.last_issued += 1;
        self.in_flight = Some(self.last_issued);
        self.last_issued
    }

    /// 该代号是否仍是最新且未完成的加载。
    pub fn is_current(&self, generation: u64) -> bool {
        self.in_flight == Some(generation)
    }

    /// 结束当前加载。
    pub fn finish(&mut self, generation: u64) {
        if self.is_current(generation) {
            self.in_flight = None;
        }
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: u32) -> ImageId {
        ImageId::new(value).expect("valid id")
    }

    #[test]
    fn title_reflects_identifier_backend_and_offline() {
        let mut state = ViewState {
            offline: false,
            backend: Backend::Modern,
            current: id(7),
        };
        assert_eq!(state.title(), "Gary Viewer - #7 [Direct2D]");

        state.offline = true;
        state.backend = Backend::Legacy;
        assert_eq!(state.title(), "Gary Viewer - #7 [GDI] (offline)");
    }

    #[test]
    fn newer_load_supersedes_older_one() {
        let mut tracker = LoadTracker::default();

        let first = tracker.begin();
        let second = tracker.begin();

        assert!(second > first);
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));

        tracker.finish(first);
        assert_eq!(tracker.in_flight(), Some(second));

        tracker.finish(second);
        assert_eq!(tracker.in_flight(), None);
        assert!(!tracker.is_current(second));
    }
}
