//! # Gary Viewer — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 shell（仅 Windows）                       │
//! │   窗口类 · 菜单 · 消息循环 · 后台加载任务 · 结果回投        │
//! └───────┬──────────────────────────────────────▲───────────┘
//!         │ ViewerEvent                          │ LoadOutcome（WM_APP 回投）
//! ┌───────▼──────────────────────────────────────┴───────────┐
//! │  app ── ViewerApp（ViewState · 位图槽 · 加载代号）         │
//! │   ├─ image_pipeline   取字节 → 解码 → 规范化 BGRA         │
//! │   └─ render           Painter：Direct2D / GDI / 软件      │
//! │  config · error                                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`config`] | `ViewerConfig`：默认常量与可选 JSON 覆盖 |
//! | [`error`] | 应用级错误 `AppError` |
//! | [`image_pipeline`] | 按编号获取字节（离线优先 / CDN）、首帧解码、32bpp 预乘 BGRA |
//! | [`render`] | `Painter` 接口、拉伸几何、软件 / Direct2D / GDI 后端 |
//! | [`app`] | `ViewerApp`：事件 → 状态变化 / 加载请求 / 重绘 |
//! | `shell` | Win32 窗口与消息循环（仅 Windows） |

pub mod app;
pub mod config;
pub mod error;
pub mod image_pipeline;
pub mod render;

#[cfg(windows)]
pub mod shell;
