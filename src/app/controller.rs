//! # 呈现循环控制器
//!
//! ## 设计思路
//!
//! `ViewerApp` 是唯一持有应用状态的对象（替代全局单例），窗口过程只负责把
//! 平台消息翻译成 `ViewerEvent` 并执行返回的 `Reaction`。
//! 这样加载/解码/呈现的全部语义都可以脱离真实窗口测试。
//!
//! ## 实现思路
//!
//! - 创建窗口、刷新（随机编号）、设定编号、切换离线 → 发起加载（`Reaction::StartLoad`）。
//! - 切换后端只触发重绘，不重新获取。
//! - 加载结果通过 `complete_load` 回到 UI 线程：过期代号直接丢弃；
//!   两个后端的位图都创建成功后才整体替换，任何一步失败都保持原状态。

use crate::config::ViewerConfig;
use crate::image_pipeline::{ImageId, LoadOutcome, LoadRequest};
use crate::render::{Backend, Painter, PresentOutcome, SurfaceError, SurfaceSize};

use super::slots::BackendSlot;
use super::state::{LoadPhase, LoadTracker, ViewState};

/// 来自窗口层的事件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEvent {
    /// 窗口创建完成。
    Created,
    /// 刷新：随机选择新编号。
    Refresh,
    /// 用户确认输入的编号。
    SetIdentifier(ImageId),
    ToggleOffline,
    ToggleBackend,
    Resized(SurfaceSize),
    About,
}

/// 窗口层需要执行的动作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Nothing,
    /// 重绘并刷新标题。
    Repaint,
    /// 在后台执行加载，完成后调用 `complete_load`。
    StartLoad(LoadRequest),
    ShowAbout,
}

/// 查看器应用状态。
pub struct ViewerApp<M: Painter, L: Painter> {
    max_identifier: u32,
    state: ViewState,
    phase: LoadPhase,
    tracker: LoadTracker,
    modern: BackendSlot<M>,
    legacy: BackendSlot<L>,
}

impl<M: Painter, L: Painter> ViewerApp<M, L> {
    pub fn new(config: &ViewerConfig, modern: M, legacy: L) -> Self {
        Self {
            max_identifier: config.max_identifier,
            state: ViewState {
                offline: config.start_offline,
                backend: config.initial_backend,
                current: config.initial_image_id(),
            },
            phase: LoadPhase::Idle,
            tracker: LoadTracker::default(),
            modern: BackendSlot::new(modern),
            legacy: BackendSlot::new(legacy),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn title(&self) -> String {
        self.state.title()
    }

    pub fn max_identifier(&self) -> u32 {
        self.max_identifier
    }

    pub fn modern(&self) -> &BackendSlot<M> {
        &self.modern
    }

    pub fn legacy(&self) -> &BackendSlot<L> {
        &self.legacy
    }

    pub fn modern_mut(&mut self) -> &mut BackendSlot<M> {
        &mut self.modern
    }

    pub fn legacy_mut(&mut self) -> &mut BackendSlot<L> {
        &mut self.legacy
    }

    /// 处理窗口事件。
    pub fn handle_event(&mut self, event: ViewerEvent) -> Reaction {
        match event {
            ViewerEvent::Created => self.begin_load(self.state.current),
            ViewerEvent::Refresh => {
                let identifier = ImageId::random(self.max_identifier);
                log::info!("🔄 刷新 - 随机编号: {}", identifier);
                self.begin_load(identifier)
            }
            ViewerEvent::SetIdentifier(identifier) => self.begin_load(identifier),
            ViewerEvent::ToggleOffline => {
                self.state.offline = !self.state.offline;
                log::info!("📴 离线模式: {}", self.state.offline);
                self.begin_load(self.state.current)
            }
            ViewerEvent::ToggleBackend => {
                self.state.backend = self.state.backend.toggled();
                log::info!("🎨 切换渲染后端: {}", self.state.backend);
                Reaction::Repaint
            }
            ViewerEvent::Resized(size) => {
                self.resize(size);
                Reaction::Repaint
            }
            ViewerEvent::About => Reaction::ShowAbout,
        }
    }

    fn begin_load(&mut self, identifier: ImageId) -> Reaction {
        let generation = self.tracker.begin();
        self.phase = LoadPhase::Loading { generation };
        Reaction::StartLoad(LoadRequest {
            generation,
            identifier,
            offline: self.state.offline,
        })
    }

    /// 在 UI 线程应用一次加载结果。
    pub fn complete_load(&mut self, outcome: LoadOutcome) -> Reaction {
        let generation = outcome.request.generation;
        if !self.tracker.is_current(generation) {
            log::debug!("丢弃过期的加载结果 - 代号: {}", generation);
            return Reaction::Nothing;
        }
        self.tracker.finish(generation);

        let image = match outcome.result {
            Ok(image) => image,
            Err(_) => {
                self.phase = LoadPhase::FailedNoChange;
                return Reaction::Nothing;
            }
        };

        let modern_bitmap = match self.modern.prepare(&image.modern) {
            Ok(bitmap) => bitmap,
            Err(err) => {
                log::warn!("⚠️ {} 位图创建失败，保留当前图片：{}", Backend::Modern, err);
                self.phase = LoadPhase::FailedNoChange;
                return Reaction::Nothing;
            }
        };
        let legacy_bitmap = match self.legacy.prepare(&image.legacy) {
            Ok(bitmap) => bitmap,
            Err(err) => {
                log::warn!("⚠️ {} 位图创建失败，保留当前图片：{}", Backend::Legacy, err);
                self.phase = LoadPhase::FailedNoChange;
                return Reaction::Nothing;
            }
        };

        self.modern.install(image.modern, modern_bitmap);
        self.legacy.install(image.legacy, legacy_bitmap);
        self.state.current = image.identifier;
        self.phase = LoadPhase::Loaded;

        log::info!(
            "🐱 已显示编号 {}（来源: {} 大小: {} bytes）",
            image.identifier,
            image.origin.as_str(),
            image.byte_len
        );
        Reaction::Repaint
    }

    /// 用当前后端绘制。
    pub fn paint(&mut self) -> Result<PresentOutcome, SurfaceError> {
        match self.state.backend {
            Backend::Modern => self.modern.paint(),
            Backend::Legacy => self.legacy.paint(),
        }
    }

    fn resize(&mut self, size: SurfaceSize) {
        if let Err(err) = self.modern.resize(size) {
            log::warn!("⚠️ {} 表面调整尺寸失败：{}", Backend::Modern, err);
        }
        if let Err(err) = self.legacy.resize(size) {
            log::warn!("⚠️ {} 表面调整尺寸失败：{}", Backend::Legacy, err);
        }
    }
}
