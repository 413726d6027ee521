//! # 后台加载调度
//!
//! ## 设计思路
//!
//! 取字节与解码在 tokio 多线程运行时中执行，UI 线程不被阻塞。
//! 同一时刻只保留一个加载任务：发起新加载时中止上一个。
//! 结果经 mpsc 通道交回，并向窗口投递 `WM_LOAD_COMPLETE`，
//! UI 线程收到消息后统一取出结果交给 `ViewerApp::complete_load`。
//!
//! ## 实现思路
//!
//! - `HWND` 不是 `Send`，跨线程只传递其数值，投递时再还原。
//! - 已在 `spawn_blocking` 中运行的解码无法中止，其结果由加载代号过滤。
//! - 运行时在 drop 时以 `shutdown_background` 关闭，不等待残留的解码线程。

use std::ffi::c_void;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{PostMessageW, WM_APP};

use crate::image_pipeline::{ByteSource, ImageLoader, LoadOutcome, LoadRequest};

/// 后台加载完成通知。
pub(crate) const WM_LOAD_COMPLETE: u32 = WM_APP + 1;

/// 可跨线程传递的窗口句柄数值。
#[derive(Debug, Clone, Copy)]
struct PostTarget(usize);

impl PostTarget {
    fn new(hwnd: HWND) -> Self {
        Self(hwnd.0 as usize)
    }

    fn notify(self) {
        let hwnd = HWND(self.0 as *mut c_void);
        if let Err(err) = unsafe { PostMessageW(Some(hwnd), WM_LOAD_COMPLETE, WPARAM(0), LPARAM(0)) } {
            log::warn!("⚠️ 投递加载完成消息失败: {}", err);
        }
    }
}

pub(crate) struct LoadDispatcher<S> {
    runtime: Option<Runtime>,
    loader: Arc<ImageLoader<S>>,
    sender: mpsc::UnboundedSender<LoadOutcome>,
    receiver: mpsc::UnboundedReceiver<LoadOutcome>,
    in_flight: Option<JoinHandle<()>>,
    target: PostTarget,
}

impl<S: ByteSource + 'static> LoadDispatcher<S> {
    pub(crate) fn new(runtime: Runtime, loader: ImageLoader<S>, hwnd: HWND) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            runtime: Some(runtime),
            loader: Arc::new(loader),
            sender,
            receiver,
            in_flight: None,
            target: PostTarget::new(hwnd),
        }
    }

    /// 启动一次加载，中止尚未完成的上一次加载。
    pub(crate) fn start(&mut self, request: LoadRequest) {
        self.cancel();

        let Some(runtime) = &self.runtime else {
            return;
        };

        let loader = Arc::clone(&self.loader);
        let sender = self.sender.clone();
        let target = self.target;

        log::debug!(
            "🚀 发起加载 - 编号: {} 离线: {} 代号: {}",
            request.identifier,
            request.offline,
            request.generation
        );

        self.in_flight = Some(runtime.spawn(async move {
            let outcome = loader.load(request).await;
            if sender.send(outcome).is_ok() {
                target.notify();
            }
        }));
    }

    /// 中止进行中的加载。
    pub(crate) fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    /// 取出所有已完成的加载结果（UI 线程调用）。
    pub(crate) fn drain(&mut self) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.receiver.try_recv() {
            outcomes.push(outcome);
        }
        outcomes
    }
}

impl<S> Drop for LoadDispatcher<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
