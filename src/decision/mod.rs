pub mod batch;
pub mod error;
pub mod fallback;
pub mod normalizer;
pub mod orchestrator;
pub mod telemetry;

pub use batch::{BatchItemResult, BatchReport, DecisionHandler, run_batch};
pub use error::{DecisionError, DecisionErrorKind};
pub use fallback::{FALLBACK_CONFIDENCE, FallbackGenerator};
pub use normalizer::{OutputNormalizer, UNSTRUCTURED_CONFIDENCE};
pub use orchestrator::{DecisionOrchestrator, DecisionPath, DecisionReport};
pub use telemetry::{DecisionStage, DecisionTelemetryEvent, DecisionTelemetryHook};
