// src/task/build.rs

//! Turn a compiled [`Plan`] into a runnable task tree.

use crate::plan::Plan;
use crate::task::{ActionTask, ForkJoin, Task, TaskSequence, WaitTask};

/// Build the task tree for a plan. Pure; no hardware is touched until the
/// root task is started.
pub fn build(plan: Plan) -> Box<dyn Task> {
    match plan {
        Plan::Seq {
            label,
            repeats,
            steps,
        } => {
            let children = steps.into_iter().map(build).collect();
            Box::new(TaskSequence::new(label, repeats, children))
        }
        Plan::Fork { label, branches } => {
            let branches = branches.into_iter().map(build).collect();
            Box::new(ForkJoin::new(label, branches))
        }
        Plan::Act(step) => Box::new(ActionTask::new(step)),
        Plan::Wait(spec) => Box::new(WaitTask::new(spec)),
    }
}
