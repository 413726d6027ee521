//! # Win32 外壳（仅 Windows）
//!
//! ## 设计思路
//!
//! 外壳不含任何加载 / 解码 / 呈现逻辑，只负责：
//! 1. 创建 tokio 运行时、字节来源与加载器
//! 2. 注册窗口类、创建带菜单的主窗口
//! 3. 构造两个原生渲染器与 `ViewerApp`，挂到窗口上
//! 4. 运行消息循环直到 `WM_QUIT`
//!
//! 启动阶段任一步失败都以 `AppError` 返回给 `main`。

mod dispatch;
mod menu;
mod window;

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;

use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, CreateWindowExW, DispatchMessageW, GetMessageW,
    IDC_ARROW, LoadCursorW, MSG, RegisterClassW, SW_SHOW, ShowWindow, TranslateMessage,
    UpdateWindow, WINDOW_EX_STYLE, WNDCLASSW, WS_OVERLAPPEDWINDOW,
};
use windows::core::PCWSTR;

use crate::app::ViewerApp;
use crate::config::ViewerConfig;
use crate::error::AppError;
use crate::image_pipeline::{CdnByteSource, DecodeLimits, ImageLoader};
use crate::render::direct2d::Direct2dPainter;
use crate::render::gdi::GdiPainter;

use dispatch::LoadDispatcher;
use window::{WindowContext, window_proc};

const WINDOW_CLASS: &str = "GaryViewerWindow";
const WINDOW_TITLE: &str = "Gary Viewer";

/// 以 NUL 结尾的 UTF-16 字符串。
pub(crate) fn wide(value: &str) -> Vec<u16> {
    OsStr::new(value).encode_wide().chain(std::iter::once(0)).collect()
}

/// 创建主窗口并运行消息循环，直到窗口关闭。
pub fn run(config: ViewerConfig) -> Result<(), AppError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("gary-loader")
        .build()?;

    let source = CdnByteSource::new(&config)?;
    let loader = ImageLoader::new(source, DecodeLimits::from(&config));

    let hinstance = unsafe { GetModuleHandleW(PCWSTR::null()) }
        .map_err(|e| AppError::Window(format!("GetModuleHandleW 失败：{}", e)))?;
    let class_name = wide(WINDOW_CLASS);
    let title = wide(WINDOW_TITLE);

    let cursor = unsafe { LoadCursorW(None, IDC_ARROW) }
        .map_err(|e| AppError::Window(format!("LoadCursorW 失败：{}", e)))?;
    let class = WNDCLASSW {
        style: CS_HREDRAW | CS_VREDRAW,
        lpfnWndProc: Some(window_proc),
        hInstance: hinstance.into(),
        hCursor: cursor,
        lpszClassName: PCWSTR(class_name.as_ptr()),
        ..Default::default()
    };
    if unsafe { RegisterClassW(&class) } == 0 {
        return Err(AppError::Window("RegisterClassW 失败".to_string()));
    }

    let menu = menu::build_menu_bar()?;
    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            PCWSTR(class_name.as_ptr()),
            PCWSTR(title.as_ptr()),
            WS_OVERLAPPEDWINDOW,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            config.window_width as i32,
            config.window_height as i32,
            None,
            Some(menu),
            Some(hinstance.into()),
            None,
        )
    }
    .map_err(|e| AppError::Window(format!("CreateWindowExW 失败：{}", e)))?;

    let modern = Direct2dPainter::new(hwnd).map_err(AppError::Surface)?;
    let legacy = GdiPainter::new(hwnd);
    let app = ViewerApp::new(&config, modern, legacy);
    let dispatcher = LoadDispatcher::new(runtime, loader, hwnd);

    log::info!(
        "🐱 Gary Viewer 启动 - 后端: {} 离线: {} 编号范围: 1-{}",
        config.initial_backend,
        config.start_offline,
        config.max_identifier
    );

    WindowContext::new(hwnd, app, dispatcher).attach();

    unsafe {
        let _ = ShowWindow(hwnd, SW_SHOW);
        let _ = UpdateWindow(hwnd);
    }

    let mut msg = MSG::default();
    loop {
        let status = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        match status.0 {
            0 => break,
            -1 => return Err(AppError::Window("GetMessageW 失败".to_string())),
            _ => unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            },
        }
    }

    log::info!("👋 Gary Viewer 退出");
    Ok(())
}
