pub mod refresh_worker;

pub use refresh_worker::{HealthStats, RefreshScheduler, RefreshTrigger, SharedHealthStats, SharedView};
