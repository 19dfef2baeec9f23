//! API 模块
//!
//! 入站接口：请求上下文 → 流程 → 状态码 + JSON

pub mod report;

// 重新导出常用类型
pub use report::{send_report, ApiResponse};
