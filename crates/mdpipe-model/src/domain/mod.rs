mod job_id;
pub use job_id::JobId;

mod job_target;
pub use job_target::JobTarget;

mod job;
pub use job::Job;

mod job_status;
pub use job_status::JobStatus;

mod execution;
pub use execution::{ExecutionResult, Outcome};

mod summary;
pub use summary::{JobReport, Summary};

mod record;
pub use record::{ModuleRecord, RecordStatus, SummaryRecord};
