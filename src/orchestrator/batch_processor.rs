//! 批量报告发送器 - 编排层
//!
//! ## 职责
//!
//! 本模块是命令行程序的入口，负责批量发送和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：日志文件、加载数据集、创建邮件传输和报告流程
//! 2. **批量加载**：找出所有尚未投递的批次
//! 3. **并发控制**：使用 Semaphore 限制同时发送的数量
//! 4. **结果回写**：把 `delivered` 标记写回数据集文件
//! 5. **全局统计**：汇总成功 / 跳过 / 失败数量

use anyhow::{Context, Result};
use futures::future::join_all;
use lettre::message::Mailbox;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, ConfigError};
use crate::infrastructure::MemoryStore;
use crate::models::{load_dataset, save_dataset, QualityBatch, Role};
use crate::services::{transport_from_config, DeliveryDispatcher, MailTransport, TemplateService};
use crate::utils::logging::{
    append_log_line, init_log_file, log_pending_loaded, log_startup, print_final_stats,
    truncate_text,
};
use crate::workflow::{AuthenticatedUser, ReportCtx, ReportFlow};

/// 应用主结构
pub struct App {
    config: Config,
    store: Arc<MemoryStore>,
    flow: Arc<ReportFlow>,
}

/// 一次运行的统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub success: usize,
    /// 客户缺少证件号
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

/// 单个批次的结果
enum Outcome {
    Sent,
    Skipped,
    Failed,
}

impl App {
    /// 初始化应用（按配置创建邮件传输）
    pub async fn initialize(config: Config) -> Result<Self> {
        let transport = transport_from_config(&config)?;
        Self::initialize_with_transport(config, transport).await
    }

    /// 使用指定的邮件传输初始化
    pub async fn initialize_with_transport(
        config: Config,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(config.max_concurrent_dispatches, transport.name());

        config
            .from_email
            .parse::<Mailbox>()
            .map_err(|_| ConfigError::InvalidFromAddress {
                value: config.from_email.clone(),
            })?;

        let dataset = load_dataset(&PathBuf::from(&config.dataset_file)).await?;
        let store = Arc::new(
            MemoryStore::from_dataset(dataset)
                .with_context(|| format!("数据集内容无效: {}", config.dataset_file))?,
        );

        let templates = Arc::new(TemplateService::with_overrides(config.template_dir())?);
        let dispatcher = DeliveryDispatcher::new(
            transport,
            templates,
            store.clone(),
            config.from_email.clone(),
        );
        let flow = Arc::new(ReportFlow::new(&config, store.clone(), dispatcher));

        Ok(Self {
            config,
            store,
            flow,
        })
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunSummary> {
        let pending = self.load_pending().await?;

        if pending.is_empty() {
            warn!("⚠️ 没有待发送的批次，程序结束");
            print_final_stats(0, 0, 0, &self.config.output_log_file);
            return Ok(RunSummary::default());
        }

        let summary = self.dispatch_all(pending).await?;

        let snapshot = self.store.snapshot().await;
        save_dataset(&PathBuf::from(&self.config.dataset_file), &snapshot)
            .await
            .context("无法写回数据集")?;

        print_final_stats(
            summary.success,
            summary.skipped,
            summary.failed,
            &self.config.output_log_file,
        );
        Ok(summary)
    }

    /// 加载待发送的批次
    async fn load_pending(&self) -> Result<Vec<QualityBatch>> {
        info!("\n📁 正在扫描待发送的批次...");
        let snapshot = self.store.snapshot().await;
        log_pending_loaded(snapshot.pending_count(), snapshot.batches.len());
        Ok(snapshot.batches.into_iter().filter(|b| !b.delivered).collect())
    }

    /// 并发发送所有批次
    async fn dispatch_all(&self, pending: Vec<QualityBatch>) -> Result<RunSummary> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_dispatches));
        let operator = AuthenticatedUser::new(0, self.config.operator.clone(), Role::Admin);
        let mut handles = Vec::with_capacity(pending.len());

        for batch in pending {
            let permit = semaphore.clone().acquire_owned().await?;
            let flow = self.flow.clone();
            let ctx = ReportCtx::new(operator.clone(), batch.id);
            let log_file = self.config.output_log_file.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let outcome = match flow.run(&ctx).await {
                    Ok(receipt) => {
                        let line = format!("{} -> {}", batch.lot_code, receipt.recipient);
                        (Outcome::Sent, line)
                    }
                    Err(AppError::Precondition(e)) => {
                        (Outcome::Skipped, format!("{} omitido: {}", batch.lot_code, e))
                    }
                    Err(e) => {
                        error!("[{}] ❌ 发送失败: {}", batch.lot_code, e);
                        let detail = truncate_text(&e.to_string(), 200);
                        (Outcome::Failed, format!("{} falló: {}", batch.lot_code, detail))
                    }
                };
                if let Err(e) = append_log_line(&log_file, &outcome.1) {
                    warn!("无法写入日志文件 {}: {}", log_file, e);
                }
                outcome.0
            });
            handles.push(handle);
        }

        let mut summary = RunSummary::default();
        for result in join_all(handles).await {
            match result {
                Ok(Outcome::Sent) => summary.success += 1,
                Ok(Outcome::Skipped) => summary.skipped += 1,
                Ok(Outcome::Failed) => summary.failed += 1,
                Err(e) => {
                    error!("任务执行失败: {}", e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}
