//! # 主窗口与窗口过程
//!
//! ## 设计思路
//!
//! 窗口过程只做消息翻译：平台消息 → `ViewerEvent` / 输入按键 / 加载结果，
//! 再执行 `ViewerApp` 返回的 `Reaction`。状态全部由 `WindowContext` 独占持有，
//! 通过 `GWLP_USERDATA` 挂在窗口上，窗口销毁（`WM_NCDESTROY`）时释放。
//!
//! ## 实现思路
//!
//! - 上下文包在 `RefCell` 中：`SetWindowTextW`、`MessageBoxW` 等调用会同步重入窗口过程，
//!   重入时借用失败的消息直接交给 `DefWindowProcW`。
//! - 关于对话框在释放借用之后再弹出，模态循环期间仍可正常重绘。
//! - GDI 与 Direct2D 都直接绘制到窗口，`WM_PAINT` 结束时 `ValidateRect`，
//!   `WM_ERASEBKGND` 不擦除背景以避免闪烁。

use std::cell::RefCell;

use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Gdi::{InvalidateRect, ValidateRect};
use windows::Win32::UI::Input::KeyboardAndMouse::VK_F5;
use windows::Win32::UI::WindowsAndMessaging::{
    DefWindowProcW, GWLP_USERDATA, GetWindowLongPtrW, MB_ICONINFORMATION, MB_OK, MessageBoxW,
    PostQuitMessage, SetWindowLongPtrW, SetWindowTextW, WM_CHAR, WM_COMMAND, WM_DESTROY,
    WM_ERASEBKGND, WM_KEYDOWN, WM_NCDESTROY, WM_PAINT, WM_SIZE,
};
use windows::core::PCWSTR;

use super::dispatch::{LoadDispatcher, WM_LOAD_COMPLETE};
use super::menu::MenuCommand;
use super::wide;
use crate::app::{DigitEntry, EntryKey, Reaction, ViewerApp, ViewerEvent};
use crate::image_pipeline::CdnByteSource;
use crate::render::direct2d::Direct2dPainter;
use crate::render::gdi::GdiPainter;
use crate::render::{PresentOutcome, SurfaceSize};

pub(crate) type WindowApp = ViewerApp<Direct2dPainter, GdiPainter>;

/// 窗口独占的全部状态。
pub(crate) struct WindowContext {
    hwnd: HWND,
    app: WindowApp,
    dispatcher: LoadDispatcher<CdnByteSource>,
    entry: DigitEntry,
}

/// 需要在释放上下文借用之后执行的动作。
enum Deferred {
    None,
    ShowAbout,
}

impl WindowContext {
    pub(crate) fn new(hwnd: HWND, app: WindowApp, dispatcher: LoadDispatcher<CdnByteSource>) -> Self {
        Self {
            hwnd,
            app,
            dispatcher,
            entry: DigitEntry::default(),
        }
    }

    /// 将上下文挂到窗口上，并发起首次加载。
    pub(crate) fn attach(self) {
        let hwnd = self.hwnd;
        let cell = Box::new(RefCell::new(self));
        let ptr = Box::into_raw(cell);
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, ptr as isize);
        }

        let deferred = match unsafe { &*ptr }.try_borrow_mut() {
            Ok(mut context) => context.dispatch(ViewerEvent::Created),
            Err(_) => Deferred::None,
        };
        run_deferred(hwnd, deferred);
    }

    fn dispatch(&mut self, event: ViewerEvent) -> Deferred {
        let reaction = self.app.handle_event(event);
        self.apply(reaction)
    }

    fn apply(&mut self, reaction: Reaction) -> Deferred {
        match reaction {
            Reaction::Nothing => Deferred::None,
            Reaction::Repaint => {
                self.refresh_title();
                unsafe {
                    let _ = InvalidateRect(Some(self.hwnd), None, false);
                }
                Deferred::None
            }
            Reaction::StartLoad(request) => {
                self.dispatcher.start(request);
                self.refresh_title();
                Deferred::None
            }
            Reaction::ShowAbout => Deferred::ShowAbout,
        }
    }

    fn refresh_title(&self) {
        let title = self
            .entry
            .prompt(self.app.max_identifier())
            .unwrap_or_else(|| self.app.title());
        set_window_text(self.hwnd, &title);
    }

    fn on_message(&mut self, msg: u32, wparam: WPARAM, lparam: LPARAM) -> Option<(LRESULT, Deferred)> {
        match msg {
            WM_COMMAND => {
                let id = (wparam.0 & 0xFFFF) as u16;
                let command = MenuCommand::from_id(id)?;
                let deferred = match command.event() {
                    Some(event) => self.dispatch(event),
                    None => {
                        self.entry.begin();
                        self.refresh_title();
                        Deferred::None
                    }
                };
                Some((LRESULT(0), deferred))
            }
            WM_CHAR => {
                let ch = char::from_u32(wparam.0 as u32)?;
                let key = self.entry.press(ch, self.app.max_identifier())?;
                let deferred = match key {
                    EntryKey::Pending | EntryKey::Cancelled => {
                        self.refresh_title();
                        Deferred::None
                    }
                    EntryKey::Confirmed(Ok(identifier)) => self.dispatch(ViewerEvent::SetIdentifier(identifier)),
                    EntryKey::Confirmed(Err(err)) => {
                        log::warn!("⚠️ 编号输入无效: {}", err);
                        self.refresh_title();
                        Deferred::None
                    }
                };
                Some((LRESULT(0), deferred))
            }
            WM_KEYDOWN if wparam.0 == VK_F5.0 as usize && !self.entry.is_active() => {
                Some((LRESULT(0), self.dispatch(ViewerEvent::Refresh)))
            }
            WM_SIZE => {
                let size = SurfaceSize::from_size_lparam(lparam.0);
                Some((LRESULT(0), self.dispatch(ViewerEvent::Resized(size))))
            }
            WM_ERASEBKGND => Some((LRESULT(1), Deferred::None)),
            WM_PAINT => {
                self.paint();
                Some((LRESULT(0), Deferred::None))
            }
            WM_LOAD_COMPLETE => {
                let mut deferred = Deferred::None;
                for outcome in self.dispatcher.drain() {
                    let reaction = self.app.complete_load(outcome);
                    deferred = self.apply(reaction);
                }
                Some((LRESULT(0), deferred))
            }
            WM_DESTROY => {
                self.dispatcher.cancel();
                unsafe { PostQuitMessage(0) };
                Some((LRESULT(0), Deferred::None))
            }
            _ => None,
        }
    }

    fn paint(&mut self) {
        match self.app.paint() {
            Ok(PresentOutcome::Presented) => {}
            Ok(PresentOutcome::DeviceLost) => unsafe {
                let _ = InvalidateRect(Some(self.hwnd), None, false);
            },
            Err(err) => log::warn!("⚠️ 绘制失败 - backend={} 原因: {}", self.app.state().backend, err),
        }
        unsafe {
            let _ = ValidateRect(Some(self.hwnd), None);
        }
    }
}

fn set_window_text(hwnd: HWND, text: &str) {
    let title = wide(text);
    if let Err(err) = unsafe { SetWindowTextW(hwnd, PCWSTR(title.as_ptr())) } {
        log::debug!("SetWindowTextW 失败: {}", err);
    }
}

fn run_deferred(hwnd: HWND, deferred: Deferred) {
    match deferred {
        Deferred::None => {}
        Deferred::ShowAbout => {
            let text = wide(concat!(
                "Gary Viewer ",
                env!("CARGO_PKG_VERSION"),
                "\n\n",
                "Shows pictures of Gary the cat with Direct2D or GDI.\n",
                "Refresh picks a random number; Set number lets you type one and press Enter."
            ));
            let caption = wide("About Gary Viewer");
            unsafe {
                MessageBoxW(
                    Some(hwnd),
                    PCWSTR(text.as_ptr()),
                    PCWSTR(caption.as_ptr()),
                    MB_OK | MB_ICONINFORMATION,
                );
            }
        }
    }
}

pub(crate) unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let ptr = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *mut RefCell<WindowContext>;
    if ptr.is_null() {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }

    if msg == WM_NCDESTROY {
        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
            drop(Box::from_raw(ptr));
            return DefWindowProcW(hwnd, msg, wparam, lparam);
        }
    }

    let handled = match unsafe { &*ptr }.try_borrow_mut() {
        Ok(mut context) => context.on_message(msg, wparam, lparam),
        Err(_) => None,
    };

    match handled {
        Some((result, deferred)) => {
            run_deferred(hwnd, deferred);
            result
        }
        None => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}
