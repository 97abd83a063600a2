pub mod adjust;
pub mod align;
pub mod blend;
pub mod fps;
pub mod orchestrator;
pub mod params;
pub mod stop;

pub use adjust::adjust;
pub use align::align;
pub use blend::blend;
pub use fps::FpsEstimator;
pub use orchestrator::{ExitReason, LoopSettings, Orchestrator, PipelineStage, RunSummary};
pub use params::{ParamField, ParameterStore, Parameters};
pub use stop::{stop_channel, StopHandle, StopSignal};
