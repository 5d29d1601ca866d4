//! Foreman orchestration layer.
//!
//! This crate provides the [`Orchestrator`], which drives the poll cycle:
//! query each board source for ready items, claim each new item once per
//! session, move it to `in_progress`, delegate it to the coding agent, then
//! move it to `in_review` and collect the pull request's test plan.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The orchestrator sequences calls between business
//! logic in the [`pipeline`] crate and the infrastructure ports (board, issue
//! tracker, delegator, document store). It contains no GitHub or process
//! details of its own.
//!
//! ## Failure isolation
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Board query for one source | Source yields no items this cycle |
//! | Status write | Item abandoned and counted as errored |
//! | Comment post | Logged only |
//! | Delegation | Failure comment; board stays `in_progress` |
//! | Test-plan read or append | Logged; `in_review` is kept |

pub mod engine;
pub mod notices;
pub mod report;


pub use engine::{Orchestrator, OrchestratorError, Ports};
pub use notices::Notices;
pub use report::{CycleReport, ItemOutcome, TestPlanOutcome};
