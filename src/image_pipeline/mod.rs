//! # 图片获取与解码模块（image_pipeline）
//!
//! ## 设计思路
//!
//! 将“取字节 → 解码规范化 → 交给渲染后端”按职责拆分为多个子模块：
//!
//! - `loader`：`ByteSource` 接口与离线目录 + CDN 实现
//! - `pipeline`：签名探测、像素上限、首帧解码、BGRA 预乘转换、后端绑定
//! - `handler`：编排一次加载（取一次字节、独立解码两次）并记录阶段耗时
//! - `source/error`：中间数据模型与错误类型
//!
//! ## 调用链
//!
//! ```text
//! ViewerApp::handle_event → LoadRequest
//!    ↓（后台任务）
//! ImageLoader::load
//!    ├─ ByteSource::fetch（离线读盘，失败回退网络一次）
//!    └─ decode_frame × 2（每个后端一个独立流视图）
//!    ↓（UI 线程）
//! ViewerApp::complete_load → materialize × 2 → 原子替换位图槽
//! ```

mod error;
mod handler;
mod loader;
mod pipeline;
mod source;

pub use error::{DecodeError, FetchError, IdentifierError, LoadError};
pub use handler::ImageLoader;
pub use loader::{ByteSource, CdnByteSource};
pub use pipeline::{DecodeLimits, decode_frame, materialize};
pub use source::{
    ByteOrigin, DecodedFrame, ImageId, LoadOutcome, LoadRequest, LoadedImage, PixelFormat,
    RawImageBytes,
};
