use crate::models::{Client, QualityBatch};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// 数据集快照：客户 + 批次
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub batches: Vec<QualityBatch>,
}

impl Dataset {
    /// 尚未投递的批次数量
    pub fn pending_count(&self) -> usize {
        self.batches.iter().filter(|b| !b.delivered).count()
    }
}

/// 从 TOML 文件加载数据集
pub async fn load_dataset(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        anyhow::bail!("数据文件不存在: {}", path.display());
    }

    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", path.display()))?;

    let dataset: Dataset = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", path.display()))?;

    tracing::info!(
        "成功加载 {} 个客户, {} 个批次 ({} 个待发送)",
        dataset.clients.len(),
        dataset.batches.len(),
        dataset.pending_count()
    );

    Ok(dataset)
}

/// 将数据集写回 TOML 文件（先写临时文件再替换）
pub async fn save_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    let content = toml::to_string(dataset).context("无法序列化数据集")?;

    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, content)
        .await
        .with_context(|| format!("无法写入文件: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("无法替换文件: {}", path.display()))?;

    tracing::debug!("数据集已保存: {}", path.display());
    Ok(())
}
