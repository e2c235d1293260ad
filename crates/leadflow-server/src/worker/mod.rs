//! Background workers.

mod scheduler;

pub use self::scheduler::{AgentScheduler, ScheduleEntry, SchedulerConfig};
