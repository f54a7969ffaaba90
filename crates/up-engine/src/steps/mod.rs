//! The step catalog: one module per maintenance action.
//!
//! Execution order is fixed; language runtimes go first so tool updates run
//! against the freshly installed versions, and cleanup always runs last.

mod cleanup;
mod dotnet;
mod homebrew;
mod macos;
mod mas;
mod npm;
mod nvm;
mod ohmyzsh;
mod pip;
mod pyenv;

use std::sync::Arc;

pub use cleanup::CleanupStep;
pub use dotnet::DotnetStep;
pub use homebrew::HomebrewStep;
pub use macos::MacosStep;
pub use mas::MasStep;
pub use npm::NpmStep;
pub use nvm::NvmStep;
pub use ohmyzsh::OhMyZshStep;
pub use pip::PipStep;
pub use pyenv::PyenvStep;

use crate::step::Step;

/// Every known step, in execution order.
pub fn all_steps() -> Vec<Arc<dyn Step>> {
    vec![
        Arc::new(PyenvStep),
        Arc::new(NvmStep),
        Arc::new(HomebrewStep),
        Arc::new(MasStep),
        Arc::new(MacosStep),
        Arc::new(NpmStep),
        Arc::new(PipStep),
        Arc::new(DotnetStep),
        Arc::new(OhMyZshStep),
        Arc::new(CleanupStep),
    ]
}

/// Look a step up by id.
pub fn step_by_id(id: &str) -> Option<Arc<dyn Step>> {
    all_steps().into_iter().find(|step| step.id() == id)
}
