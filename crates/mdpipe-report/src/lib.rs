//! Console report and persisted JSON summary of a batch run.
//!
//! The table printed by [`render_table`] is for humans and may change; the
//! JSON written by [`persist`] ([`SummaryRecord`]) is the machine contract.

mod error;
pub use error::ReportError;

mod table;
pub use table::{render_banner, render_footer, render_table};

mod persist;
pub use persist::{load, persist};

mod writer;
pub use writer::{ReportConfig, ReportWriter, render};

mod progress;
pub use progress::Progress;

pub use mdpipe_model::SummaryRecord;
