//! 窗口菜单
//!
//! 菜单命令与 `ViewerEvent` 一一对应，“设定编号”除外：它只进入窗口内输入状态。

use windows::Win32::UI::WindowsAndMessaging::{AppendMenuW, CreateMenu, HMENU, MF_STRING};
use windows::core::PCWSTR;

use super::wide;
use crate::app::ViewerEvent;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub(crate) enum MenuCommand {
    SwitchBackend = 101,
    Refresh = 102,
    SetNumber = 103,
    ToggleOffline = 104,
    About = 105,
}

impl MenuCommand {
    const ALL: [Self; 5] = [
        Self::SwitchBackend,
        Self::Refresh,
        Self::SetNumber,
        Self::ToggleOffline,
        Self::About,
    ];

    pub(crate) fn from_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|command| *command as u16 == id)
    }

    fn label(self) -> &'static str {
        match self {
            Self::SwitchBackend => "Switch backend",
            Self::Refresh => "Refresh",
            Self::SetNumber => "Set number",
            Self::ToggleOffline => "Toggle offline",
            Self::About => "About",
        }
    }

    /// 直接对应的应用事件；`SetNumber` 由窗口层单独处理。
    pub(crate) fn event(self) -> Option<ViewerEvent> {
        match self {
            Self::SwitchBackend => Some(ViewerEvent::ToggleBackend),
            Self::Refresh => Some(ViewerEvent::Refresh),
            Self::SetNumber => None,
            Self::ToggleOffline => Some(ViewerEvent::ToggleOffline),
            Self::About => Some(ViewerEvent::About),
        }
    }
}

/// 创建顶层菜单栏。窗口销毁时菜单随之销毁。
pub(crate) fn build_menu_bar() -> Result<HMENU, AppError> {
    let menu = unsafe { CreateMenu() }.map_err(|e| AppError::Window(format!("CreateMenu 失败：{}", e)))?;

    for command in MenuCommand::ALL {
        let label = wide(command.label());
        unsafe { AppendMenuW(menu, MF_STRING, command as usize, PCWSTR(label.as_ptr())) }
            .map_err(|e| AppError::Window(format!("AppendMenuW 失败：{}", e)))?;
    }

    Ok(menu)
}
