pub mod cycle;
pub mod scheduler;

pub use cycle::{
    build_graph, collect_activity, collect_rooms, run_cycle, submit_graph, CycleOutcome, CyclePlan,
    RoomSnapshot,
};
pub use scheduler::{Scheduler, SchedulerReport};
