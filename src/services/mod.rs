pub mod espn;
pub mod jobs;
pub mod schedule;
pub mod stat_map;

pub use espn::SourceClient;
pub use jobs::{run_job, run_scheduler, JobContext, JobReport, RefreshJob};
