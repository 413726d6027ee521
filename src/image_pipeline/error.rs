//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 按加载链路的阶段拆分错误：取字节（`FetchError`）与解码（`DecodeError`）。
//! 两者再由 `LoadError` 汇总，供编排层与应用状态层按分支匹配。
//! 通过 `thiserror` 保持人类可读错误，日志里直接 `{}` 输出即可。

/// 取字节阶段错误（磁盘或网络）。
///
/// 对调用方而言所有变体都等价于“获取失败”，变体只用于日志诊断。
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("网络错误：{0}")]
    Network(String),

    #[error("HTTP {status}：{reason}")]
    Status { status: u16, reason: &'static str },

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("响应内容为空")]
    Empty,

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

/// 解码阶段错误。
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    /// 将解码帧绑定到后端原生位图失败。
    #[error("位图创建失败：{0}")]
    Materialize(String),
}

/// 单次加载的汇总错误。
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Decode(#[from] DecodeError),
}

/// 图片编号输入校验错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("请输入数字编号")]
    Empty,

    #[error("编号不是有效整数：{0}")]
    NotANumber(String),

    #[error("编号超出范围：{value}（可选：1 ~ {max}）")]
    OutOfRange { value: u64, max: u32 },
}
