pub mod lines;
pub mod logger;
pub mod supervisor;

pub use logger::{
    default_log_dir, find_latest_log_for_step, list_step_ids_with_logs, FileLogFactory,
    LogFactory, MemoryLogFactory, StepLog,
};
pub use supervisor::{CommandFailure, RunnerError, ShellRunner};
