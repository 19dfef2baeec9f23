//! # Quality Report
//!
//! 谷物质检批次的报告流水线：渲染 PDF → 按证件号派生密钥加密 → 邮件投递
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有共享状态，只暴露能力
//! - `BatchRepository` / `MemoryStore` - 批次与客户存储
//! - `InFlightRegistry` - 同一批次同一时刻只允许一次发送
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个批次
//! - `LayoutRenderer` - 单页 PDF 渲染
//! - `key_derivation` / `encryptor` - 密钥派生与加密
//! - `TemplateService` / `DeliveryDispatcher` - 邮件正文与投递
//! - `BatchService` - 批次登记、更新与校验
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个批次"的完整报告流程
//! - `ReportCtx` - 上下文封装（操作人 + batch_id）
//! - `ReportFlow` - 流程编排（check → render → encrypt → deliver）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量发送，管理资源和并发
//! - `api/` - 单次请求入口，映射状态码
//!
//! ## 模块结构

pub mod api;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use api::{send_report, ApiResponse};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{BatchRepository, InFlightRegistry, MemoryStore};
pub use models::{BatchDraft, BatchPatch, Client, GrainType, QualityBatch};
pub use orchestrator::{App, RunSummary};
pub use workflow::{AuthenticatedUser, ReportCtx, ReportFlow, RequestCtx};
