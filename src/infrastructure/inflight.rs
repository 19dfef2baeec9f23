//! 在途登记表
//!
//! 同一批次同一时刻只允许一个报告流水线运行

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::models::BatchId;

/// 正在发送中的批次集合
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    active: Arc<Mutex<HashSet<BatchId>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试占用批次；已被占用时返回 `None`
    pub fn try_claim(&self, batch_id: BatchId) -> Option<InFlightGuard> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if active.insert(batch_id) {
            Some(InFlightGuard {
                registry: self.clone(),
                batch_id,
            })
        } else {
            None
        }
    }

    pub fn is_active(&self, batch_id: BatchId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&batch_id)
    }

    fn release(&self, batch_id: BatchId) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&batch_id);
    }
}

/// 占用凭证，drop 时释放
#[derive(Debug)]
pub struct InFlightGuard {
    registry: InFlightRegistry,
    batch_id: BatchId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.release(self.batch_id);
    }
}
