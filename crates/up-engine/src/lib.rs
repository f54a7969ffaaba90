pub mod engine;
pub mod step;
pub mod steps;
pub mod versions;

pub use engine::{ConfirmationOracle, EngineOptions, UpdateEngine, VersionCollector};
pub use step::{check_command_exists, check_path_exists, Step, StepContext};
pub use versions::{SystemVersionCollector, VersionProbe};
