use async_trait::async_trait;
use mdpipe_model::{ExecutionResult, Job};
use tokio_util::sync::CancellationToken;

/// Runs exactly one job to a terminal [`ExecutionResult`].
///
/// Implementations contain every failure in the returned result; `execute`
/// itself never fails. `cancel` fires only when the whole batch is being torn
/// down, never because of another job.
#[async_trait]
pub trait Executor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, job: &Job, cancel: CancellationToken) -> ExecutionResult;
}
