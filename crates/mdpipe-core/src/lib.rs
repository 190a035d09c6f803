pub mod error;
pub use error::CoreError;

pub mod registry;
pub use registry::JobRegistry;

pub mod aggregator;
pub use aggregator::ResultAggregator;

pub mod events;
pub use events::{JobEvent, JobEventKind, Subscribe};

pub mod executor;
pub use executor::Executor;

pub mod scheduler;
pub use scheduler::{DEFAULT_MAX_WORKERS, PoolConfig, Scheduler};
