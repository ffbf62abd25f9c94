//! Resumable per-task pipeline and the discovery loop that feeds it.
//!
//! Each task moves through acquire, transcode and publish stages. Every
//! completed stage is checkpointed in the task status store before the next
//! one begins, so a restarted task resumes at the first unfinished stage.

mod driver;
mod naming;
mod poll;
mod runner;
pub mod state;
mod types;

pub use driver::{PipelineLoop, TickReport};
pub use naming::{canonical_file_name, sanitize_file_component};
pub use poll::{poll_until, PollPolicy};
pub use runner::TaskPipeline;
pub use state::{PipelineState, Stage, StageOutcome, TransitionError};
pub use types::{PipelineError, TaskDescriptor};
