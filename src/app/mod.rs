//! # 应用状态与呈现循环（app）
//!
//! - `state`：`ViewState`、加载阶段与加载代号
//! - `slots`：每个后端一个位图槽（渲染器 + 解码帧 + 原生位图）
//! - `controller`：`ViewerApp`，把窗口事件翻译为状态变化、加载请求与重绘
//! - `entry`：窗口内编号输入

mod controller;
mod entry;
mod slots;
mod state;

pub use controller::{Reaction, ViewerApp, ViewerEvent};
pub use entry::{DigitEntry, EntryKey};
pub use slots::BackendSlot;
pub use state::{LoadPhase, LoadTracker, ViewState};
