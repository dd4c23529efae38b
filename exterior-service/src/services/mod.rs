pub mod metrics;
pub mod providers;
pub mod storage;

pub use metrics::{get_metrics, init_metrics};
pub use storage::{LocalStorage, MemoryStorage, ObjectStore, S3Storage};
