pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    CompletedStepRecord, ConfirmationAnswer, DisplayStep, OutputLine, OutputSource, Prompt,
    PromptMode, ResolvedVersion, RunState, StepPhase,
};
