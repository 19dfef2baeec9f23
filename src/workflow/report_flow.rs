//! 报告处理流程 - 流程层
//!
//! 核心职责：定义"一个批次"的完整报告流程
//!
//! 流程顺序：
//! 1. 读取批次与客户，检查证件号（缺失则直接返回，不渲染）
//! 2. 占用在途登记（同一批次并发请求直接拒绝）
//! 3. 渲染 PDF → 派生密钥 → 加密 → 投递
//!
//! 任一步失败立即中止，`delivered` 不会被设置。

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, PreconditionError, StoreError};
use crate::infrastructure::{BatchRepository, InFlightRegistry};
use crate::models::{Client, QualityBatch};
use crate::services::{encrypt_with_identifier, DeliveryDispatcher, DeliveryReceipt, LayoutRenderer};
use crate::workflow::report_ctx::ReportCtx;

/// 报告处理流程
///
/// - 编排完整的报告流程
/// - 决定何时校验、何时渲染、何时投递
/// - 只依赖业务能力（services）和存储接口
pub struct ReportFlow {
    store: Arc<dyn BatchRepository>,
    renderer: LayoutRenderer,
    dispatcher: DeliveryDispatcher,
    in_flight: InFlightRegistry,
    verbose_logging: bool,
}

impl ReportFlow {
    pub fn new(
        config: &Config,
        store: Arc<dyn BatchRepository>,
        dispatcher: DeliveryDispatcher,
    ) -> Self {
        Self {
            store,
            renderer: LayoutRenderer::new(),
            dispatcher,
            in_flight: InFlightRegistry::new(),
            verbose_logging: config.verbose_logging,
        }
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    pub async fn run(&self, ctx: &ReportCtx) -> AppResult<DeliveryReceipt> {
        // ========== 步骤 1: 读取并检查前置条件 ==========
        let (batch, client) = self.load(ctx).await?;
        let identifier = match client.identifier() {
            Some(identifier) => identifier.to_string(),
            None => {
                warn!("{} ⚠️ 客户 {} 没有证件号，跳过", ctx, client.username);
                return Err(PreconditionError::MissingIdentifier {
                    client_id: client.id,
                }
                .into());
            }
        };

        // ========== 步骤 2: 占用批次 ==========
        let _guard = self.in_flight.try_claim(batch.id).ok_or(AppError::InFlight {
            batch_id: batch.id,
        })?;

        info!("{} 📄 正在生成批次 {} 的报告...", ctx, batch.lot_code);

        // ========== 步骤 3: 渲染 → 加密 → 投递 ==========
        let document = self.renderer.render(&batch, &client)?;
        if self.verbose_logging {
            debug!("{} PDF 大小: {} 字节", ctx, document.len());
        }

        let payload = encrypt_with_identifier(document.as_bytes(), &identifier)?;
        if self.verbose_logging {
            debug!("{} 密文大小: {} 字节", ctx, payload.ciphertext.len());
        }

        let receipt = self.dispatcher.deliver(&batch, &client, &payload).await?;
        info!("{} ✓ 报告流程完成", ctx);
        Ok(receipt)
    }

    async fn load(&self, ctx: &ReportCtx) -> AppResult<(QualityBatch, Client)> {
        let batch = self
            .store
            .get_batch(ctx.batch_id)
            .await?
            .ok_or(StoreError::BatchNotFound {
                batch_id: ctx.batch_id,
            })?;
        let client = self
            .store
            .get_client(batch.client_id)
            .await?
            .ok_or(StoreError::ClientNotFound {
                client_id: batch.client_id,
            })?;
        Ok((batch, client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;
    use crate::models::{GrainType, Role};
    use crate::services::{MemoryMailer, TemplateService};
    use crate::workflow::report_ctx::AuthenticatedUser;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    async fn flow_with(cedula: Option<&str>) -> (ReportFlow, Arc<MemoryStore>, Arc<MemoryMailer>, u64) {
        let store = Arc::new(MemoryStore::new());
        let mut client = Client::new(1, "jperez");
        client.email = Some("juan@example.com".into());
        client.cedula = cedula.map(String::from);
        store.upsert_client(client).await.unwrap();

        let batch = store
            .insert_batch(QualityBatch {
                id: 0,
                client_id: 1,
                lot_code: "L-001".into(),
                grain_type: GrainType::Arroz,
                processed_on: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
                quantity_kg: Decimal::new(1000_00, 2),
                humidity: Decimal::new(14_00, 2),
                impurities: Decimal::new(2_00, 2),
                good_grain: Some(Decimal::new(80_00, 2)),
                defective_grain: Some(Decimal::new(4_00, 2)),
                notes: "Secado extra".into(),
                delivered: false,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let mailer = Arc::new(MemoryMailer::new());
        let dispatcher = DeliveryDispatcher::new(
            mailer.clone(),
            Arc::new(TemplateService::new().unwrap()),
            store.clone(),
            "informes@agro.local",
        );
        let flow = ReportFlow::new(&Config::default(), store.clone(), dispatcher);
        (flow, store, mailer, batch.id)
    }

    fn ctx(batch_id: u64) -> ReportCtx {
        ReportCtx::new(AuthenticatedUser::new(9, "operador", Role::Admin), batch_id)
    }

    #[tokio::test]
    async fn missing_identifier_stops_before_rendering() {
        let (flow, store, mailer, id) = flow_with(None).await;
        let err = flow.run(&ctx(id)).await.unwrap_err();
        assert!(matches!(err, AppError::Precondition(_)));
        assert_eq!(mailer.sent_count().await, 0);
        assert!(!store.get_batch(id).await.unwrap().unwrap().delivered);
    }

    #[tokio::test]
    async fn empty_identifier_counts_as_missing() {
        let (flow, _store, _mailer, id) = flow_with(Some("")).await;
        assert!(matches!(
            flow.run(&ctx(id)).await,
            Err(AppError::Precondition(_))
        ));
    }

    #[tokio::test]
    async fn unknown_batch_is_not_found() {
        let (flow, _store, _mailer, _id) = flow_with(Some("CED123")).await;
        assert!(matches!(
            flow.run(&ctx(404)).await,
            Err(AppError::Store(StoreError::BatchNotFound { batch_id: 404 }))
        ));
    }

    #[tokio::test]
    async fn busy_batch_is_rejected_and_released_afterwards() {
        let (flow, _store, mailer, id) = flow_with(Some("CED123")).await;

        let guard = flow.in_flight().try_claim(id).unwrap();
        assert!(matches!(
            flow.run(&ctx(id)).await,
            Err(AppError::InFlight { .. })
        ));
        drop(guard);

        flow.run(&ctx(id)).await.unwrap();
        assert_eq!(mailer.sent_count().await, 1);
        assert!(!flow.in_flight().is_active(id));
    }

    #[tokio::test]
    async fn sequential_resend_delivers_again() {
        let (flow, _store, mailer, id) = flow_with(Some("CED123")).await;
        flow.run(&ctx(id)).await.unwrap();
        flow.run(&ctx(id)).await.unwrap();
        assert_eq!(mailer.sent_count().await, 2);
    }
}
