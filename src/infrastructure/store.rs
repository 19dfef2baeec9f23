//! 批次存储 - 基础设施层
//!
//! 持有唯一的数据状态，只暴露读写能力，不做业务校验

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::{BatchId, Client, ClientId, Dataset, QualityBatch};

/// 持久化接口
#[async_trait]
pub trait BatchRepository: Send + Sync {
    async fn get_batch(&self, id: BatchId) -> Result<Option<QualityBatch>, StoreError>;

    /// 按处理日期倒序、批次编码正序
    async fn list_batches(&self) -> Result<Vec<QualityBatch>, StoreError>;

    /// 插入新批次，分配 ID（忽略传入的 id）
    async fn insert_batch(&self, batch: QualityBatch) -> Result<QualityBatch, StoreError>;

    /// 覆盖已有批次
    async fn save_batch(&self, batch: &QualityBatch) -> Result<(), StoreError>;

    async fn delete_batch(&self, id: BatchId) -> Result<bool, StoreError>;

    /// 只写 `delivered` 字段
    async fn mark_delivered(&self, id: BatchId) -> Result<(), StoreError>;

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>, StoreError>;

    async fn upsert_client(&self, client: Client) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct StoreState {
    batches: BTreeMap<BatchId, QualityBatch>,
    clients: BTreeMap<ClientId, Client>,
    next_batch_id: BatchId,
}

impl StoreState {
    fn lot_code_taken(&self, lot_code: &str, except: Option<BatchId>) -> bool {
        self.batches
            .values()
            .any(|b| b.lot_code == lot_code && Some(b.id) != except)
    }
}

/// 内存存储
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState {
                next_batch_id: 1,
                ..Default::default()
            }),
        }
    }

    /// 从数据集快照构建
    ///
    /// 快照中的批次 ID、批次编码和客户 ID 必须唯一
    pub fn from_dataset(dataset: Dataset) -> Result<Self, StoreError> {
        let mut state = StoreState::default();

        for client in dataset.clients {
            if state.clients.contains_key(&client.id) {
                return Err(StoreError::DuplicateClientId {
                    client_id: client.id,
                });
            }
            state.clients.insert(client.id, client);
        }

        for batch in dataset.batches {
            if state.batches.contains_key(&batch.id) {
                return Err(StoreError::DuplicateBatchId { batch_id: batch.id });
            }
            if state.lot_code_taken(&batch.lot_code, None) {
                return Err(StoreError::DuplicateLotCode {
                    lot_code: batch.lot_code,
                });
            }
            state.batches.insert(batch.id, batch);
        }

        state.next_batch_id = state.batches.keys().max().copied().unwrap_or(0) + 1;
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// 导出当前状态
    pub async fn snapshot(&self) -> Dataset {
        let state = self.state.read().await;
        Dataset {
            clients: state.clients.values().cloned().collect(),
            batches: state.batches.values().cloned().collect(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchRepository for MemoryStore {
    async fn get_batch(&self, id: BatchId) -> Result<Option<QualityBatch>, StoreError> {
        Ok(self.state.read().await.batches.get(&id).cloned())
    }

    async fn list_batches(&self) -> Result<Vec<QualityBatch>, StoreError> {
        let state = self.state.read().await;
        let mut batches: Vec<QualityBatch> = state.batches.values().cloned().collect();
        batches.sort_by(|a, b| {
            b.processed_on
                .cmp(&a.processed_on)
                .then_with(|| a.lot_code.cmp(&b.lot_code))
        });
        Ok(batches)
    }

    async fn insert_batch(&self, mut batch: QualityBatch) -> Result<QualityBatch, StoreError> {
        let mut state = self.state.write().await;
        if state.lot_code_taken(&batch.lot_code, None) {
            return Err(StoreError::DuplicateLotCode {
                lot_code: batch.lot_code,
            });
        }
        batch.id = state.next_batch_id;
        state.next_batch_id += 1;
        state.batches.insert(batch.id, batch.clone());
        Ok(batch)
    }

    async fn save_batch(&self, batch: &QualityBatch) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.batches.contains_key(&batch.id) {
            return Err(StoreError::BatchNotFound { batch_id: batch.id });
        }
        if state.lot_code_taken(&batch.lot_code, Some(batch.id)) {
            return Err(StoreError::DuplicateLotCode {
                lot_code: batch.lot_code.clone(),
            });
        }
        state.batches.insert(batch.id, batch.clone());
        Ok(())
    }

    async fn delete_batch(&self, id: BatchId) -> Result<bool, StoreError> {
        Ok(self.state.write().await.batches.remove(&id).is_some())
    }

    async fn mark_delivered(&self, id: BatchId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        match state.batches.get_mut(&id) {
            Some(batch) => {
                batch.delivered = true;
                Ok(())
            }
            None => Err(StoreError::BatchNotFound { batch_id: id }),
        }
    }

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>, StoreError> {
        Ok(self.state.read().await.clients.get(&id).cloned())
    }

    async fn upsert_client(&self, client: Client) -> Result<(), StoreError> {
        self.state.write().await.clients.insert(client.id, client);
        Ok(())
    }
}
