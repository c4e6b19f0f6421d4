mod driver;
mod execution;
mod registry;
mod scheduler;
mod types;

pub use execution::{Execution, TaskState};
pub use registry::{ExecutionHandle, ExecutionRegistry};
pub use scheduler::{SchedulerConfig, TaskScheduler};
pub use types::{ExecutionStatus, TaskStatus};
