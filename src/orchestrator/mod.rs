//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量发送和流程调度。
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<QualityBatch>)
//!     ↓
//! workflow::ReportFlow (处理单个批次)
//!     ↓
//! services (能力层：render / encrypt / deliver)
//!     ↓
//! infrastructure (基础设施：BatchRepository / InFlightRegistry)
//! ```
//!
//! 编排层只做调度和统计，不做具体业务判断。

pub mod batch_processor;

// 重新导出主要类型
pub use batch_processor::{App, RunSummary};
