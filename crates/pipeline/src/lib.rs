//! The command application pipeline.
//!
//! After each new message the pipeline asks the model whether anyone's
//! outfit changed, and applies what it answers:
//!
//! 1. **Debounce** bursts of messages into one cycle
//! 2. **Prompt** the model with the recent transcript and the current outfit
//!    (rendered through outfit macros)
//! 3. **Extract** command calls from the reply, parse and score each one
//! 4. **Apply** those that pass the confidence threshold to the persona
//! 5. **Persist** and report one aggregate notice
//!
//! A cycle is retried a few times; repeated failed cycles disable the
//! pipeline until it is explicitly re-enabled.
//!
//! The [`SessionCoordinator`] keeps managers bound to the active character
//! and conversation and routes host events to the pipeline.

pub mod batch;
pub mod pipeline;
pub mod prompt;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use batch::{apply_batch, AppliedCommand, BatchReport, FailedCommand, LowConfidenceCommand};
pub use pipeline::{CommandPipeline, PipelineSettings, PipelineStatus, ProcessOutcome, SkipReason};
pub use prompt::default_system_prompt;
pub use session::{SessionCoordinator, SessionState};

/// Errors that escape a pipeline cycle.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Every attempt of a cycle failed to produce usable text.
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("pipeline is disabled")]
    Disabled,

    /// The failed cycle was the last one allowed; the pipeline is now off.
    #[error("pipeline disabled after {0} consecutive failures")]
    ConsecutiveFailureExhaustion(u32),
}
