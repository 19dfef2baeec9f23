//! 批次登记与维护 - 业务能力层
//!
//! 保存顺序：合并 → 规范化 → 校验（含小数位数）→ 补齐百分比 → 写入。
//! 校验失败时不会写入任何数据。

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppResult, StoreError, ValidationError};
use crate::infrastructure::BatchRepository;
use crate::models::{BatchDraft, BatchId, BatchPatch, QualityBatch};

/// 批次服务
#[derive(Clone)]
pub struct BatchService {
    store: Arc<dyn BatchRepository>,
}

impl BatchService {
    pub fn new(store: Arc<dyn BatchRepository>) -> Self {
        Self { store }
    }

    /// 登记新批次
    pub async fn register(&self, draft: BatchDraft) -> AppResult<QualityBatch> {
        let mut batch = QualityBatch::from_draft(0, draft, Utc::now());
        batch.validate()?;
        self.ensure_client(&batch).await?;
        batch.prepare_for_save();

        let stored = self.store.insert_batch(batch).await?;
        info!("✓ 已登记批次 {} (ID#{})", stored.lot_code, stored.id);
        Ok(stored)
    }

    /// 更新批次；`partial = false` 时为整体更新，必填字段必须齐全
    pub async fn update(
        &self,
        id: BatchId,
        patch: BatchPatch,
        partial: bool,
    ) -> AppResult<QualityBatch> {
        if !partial {
            patch.check_required()?;
        }

        let mut batch = self.get(id).await?;
        patch.apply_to(&mut batch);
        batch.validate()?;
        self.ensure_client(&batch).await?;
        batch.prepare_for_save();

        self.store.save_batch(&batch).await?;
        debug!("批次 {} 已更新 (partial={})", batch.lot_code, partial);
        Ok(batch)
    }

    pub async fn get(&self, id: BatchId) -> AppResult<QualityBatch> {
        self.store
            .get_batch(id)
            .await?
            .ok_or_else(|| StoreError::BatchNotFound { batch_id: id }.into())
    }

    pub async fn list(&self) -> AppResult<Vec<QualityBatch>> {
        Ok(self.store.list_batches().await?)
    }

    pub async fn delete(&self, id: BatchId) -> AppResult<()> {
        if self.store.delete_batch(id).await? {
            info!("🗑️ 已删除批次 ID#{}", id);
            Ok(())
        } else {
            Err(StoreError::BatchNotFound { batch_id: id }.into())
        }
    }

    async fn ensure_client(&self, batch: &QualityBatch) -> AppResult<()> {
        match self.store.get_client(batch.client_id).await? {
            Some(_) => Ok(()),
            None => Err(ValidationError::UnknownClient {
                client_id: batch.client_id,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::infrastructure::MemoryStore;
    use crate::models::{Client, GrainType};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn draft(lot_code: &str) -> BatchDraft {
        BatchDraft {
            client_id: 1,
            lot_code: lot_code.into(),
            grain_type: GrainType::Maiz,
            processed_on: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            quantity_kg: dec("1500"),
            humidity: dec("12"),
            impurities: dec("3"),
            good_grain: Some(dec("80")),
            defective_grain: None,
            notes: String::new(),
        }
    }

    async fn service() -> BatchService {
        let store = Arc::new(MemoryStore::new());
        store.upsert_client(Client::new(1, "jperez")).await.unwrap();
        BatchService::new(store)
    }

    #[tokio::test]
    async fn register_normalizes_and_derives() {
        let service = service().await;
        let batch = service.register(draft("  l-001 ")).await.unwrap();
        assert_eq!(batch.lot_code, "L-001");
        assert_eq!(batch.defective_grain, Some(dec("5.00")));
        assert_eq!(batch.quantity_kg.to_string(), "1500.00");
        assert!(!batch.delivered);
    }

    #[tokio::test]
    async fn register_rejects_unknown_client_and_bad_sum() {
        let service = service().await;

        let mut orphan = draft("L-002");
        orphan.client_id = 99;
        assert!(matches!(
            service.register(orphan).await,
            Err(AppError::Validation(ValidationError::UnknownClient { client_id: 99 }))
        ));

        let mut over = draft("L-003");
        over.defective_grain = Some(dec("10"));
        let err = service.register(over).await.unwrap_err();
        assert_eq!(err.to_string(), "La suma de porcentajes no puede exceder 100%.");
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stored_percentages_never_exceed_one_hundred() {
        let service = service().await;

        // 原始和为 99.994，若先校验后取两位小数，保存后会变成 100.01
        let mut rounding = draft("L-004");
        rounding.humidity = dec("24.996");
        rounding.impurities = dec("24.996");
        rounding.good_grain = Some(dec("24.996"));
        rounding.defective_grain = Some(dec("25.006"));
        assert!(matches!(
            service.register(rounding).await,
            Err(AppError::Validation(ValidationError::TooManyDecimalPlaces { .. }))
        ));
        assert!(service.list().await.unwrap().is_empty());

        let stored = service.register(draft("L-005")).await.unwrap();
        let total = stored.humidity
            + stored.impurities
            + stored.good_grain.unwrap()
            + stored.defective_grain.unwrap();
        assert!(total <= Decimal::ONE_HUNDRED);

        let patch = BatchPatch {
            impurities: Some(dec("3.005")),
            ..Default::default()
        };
        assert!(service.update(stored.id, patch, true).await.is_err());
        assert_eq!(service.get(stored.id).await.unwrap(), stored);
    }

    #[tokio::test]
    async fn rejected_update_leaves_record_untouched() {
        let service = service().await;
        let stored = service.register(draft("L-001")).await.unwrap();

        let patch = BatchPatch {
            good_grain: Some(Some(dec("90"))),
            defective_grain: Some(Some(dec("10"))),
            ..Default::default()
        };
        let err = service.update(stored.id, patch, true).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::PercentageSumExceeded { .. })
        ));
        assert_eq!(service.get(stored.id).await.unwrap(), stored);
    }

    #[tokio::test]
    async fn partial_update_rederives_cleared_percentage() {
        let service = service().await;
        let stored = service.register(draft("L-001")).await.unwrap();

        let patch = BatchPatch {
            humidity: Some(dec("10")),
            defective_grain: Some(None),
            ..Default::default()
        };
        let updated = service.update(stored.id, patch, true).await.unwrap();
        assert_eq!(updated.humidity, dec("10.00"));
        assert_eq!(updated.defective_grain, Some(dec("7.00")));
    }

    #[tokio::test]
    async fn full_update_requires_all_fields() {
        let service = service().await;
        let stored = service.register(draft("L-001")).await.unwrap();

        let patch = BatchPatch {
            humidity: Some(dec("10")),
            ..Default::default()
        };
        assert!(matches!(
            service.update(stored.id, patch, false).await,
            Err(AppError::Validation(ValidationError::MissingField { field: "cliente" }))
        ));
    }

    #[tokio::test]
    async fn get_and_delete_missing_batch() {
        let service = service().await;
        assert!(matches!(
            service.get(42).await,
            Err(AppError::Store(StoreError::BatchNotFound { batch_id: 42 }))
        ));
        assert!(service.delete(42).await.is_err());

        let stored = service.register(draft("L-001")).await.unwrap();
        service.delete(stored.id).await.unwrap();
        assert!(service.get(stored.id).await.is_err());
    }
}
