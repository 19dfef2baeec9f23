pub mod batch;
pub mod client;
pub mod grain;
pub mod loaders;

pub use batch::{BatchDraft, BatchId, BatchPatch, QualityBatch};
pub use client::{Client, ClientId, Role};
pub use grain::GrainType;
pub use loaders::{load_dataset, save_dataset, Dataset};
