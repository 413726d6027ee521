// 防止在 Windows 发布版本中显示额外的控制台窗口，不要删除！
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

//! # Gary Viewer — 应用入口
//!
//! 本文件仅负责日志与配置初始化，然后把控制权交给窗口层。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use cat_viewer::config::ViewerConfig;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match ViewerConfig::load_beside_executable() {
        Ok(config) => config,
        Err(err) => {
            log::warn!("配置文件无效，使用默认配置: {err}");
            ViewerConfig::default()
        }
    };

    #[cfg(windows)]
    {
        if let Err(err) = cat_viewer::shell::run(config) {
            log::error!("应用运行失败: {err}");
            std::process::exit(1);
        }
    }

    #[cfg(not(windows))]
    {
        let _ = config;
        log::error!("Gary Viewer 的窗口界面仅支持 Windows");
        std::process::exit(1);
    }
}
