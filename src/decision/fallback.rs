use crate::schema::{DecisionInput, DecisionOutput};

pub const FALLBACK_CONFIDENCE: f64 = 0.45;

const FALLBACK_RECOMMENDATION: &str =
    "Focus on the option that builds long-term fundamentals first.";
const FALLBACK_REASONING: [&str; 3] = [
    "Foundational skills create flexibility later",
    "This approach minimizes risk under uncertainty",
    "It aligns with typical early-stage decision paths",
];
const FALLBACK_ALTERNATIVE: &str = "Split time between both options in small, focused blocks";

/// Model-independent answer used whenever the model path cannot be trusted.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackGenerator;

impl FallbackGenerator {
    /// The input is accepted for future context-aware fallbacks; its content
    /// does not influence the result today.
    pub fn generate(&self, _input: &DecisionInput) -> DecisionOutput {
        fallback_output()
    }
}

fn fallback_output() -> DecisionOutput {
    DecisionOutput::from_constants(
        FALLBACK_RECOMMENDATION,
        &FALLBACK_REASONING,
        FALLBACK_CONFIDENCE,
        Some(FALLBACK_ALTERNATIVE),
    )
}
