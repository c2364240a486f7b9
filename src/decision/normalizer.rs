use crate::{
    decision::error::DecisionError,
    model::ModelReply,
    schema::DecisionOutput,
};

/// Confidence attached to free-text model answers: usable, but without a
/// verified structure.
pub const UNSTRUCTURED_CONFIDENCE: f64 = 0.6;

const UNSTRUCTURED_REASONING: [&str; 3] = [
    "Generated based on common scenarios",
    "Assumptions were made due to limited input",
    "Recommendation favors practical outcomes",
];
const UNSTRUCTURED_ALTERNATIVE: &str = "Consider revisiting the decision with more constraints";

#[derive(Debug, Default, Clone, Copy)]
pub struct OutputNormalizer;

impl OutputNormalizer {
    pub fn normalize(&self, reply: ModelReply) -> Result<DecisionOutput, DecisionError> {
        match reply {
            ModelReply::Structured(output) => Ok(output),
            ModelReply::Mapping(mapping) => Ok(DecisionOutput::from_mapping(mapping)?),
            ModelReply::Text(text) => Ok(DecisionOutput::new(
                text.trim(),
                UNSTRUCTURED_REASONING.iter().map(|r| r.to_string()).collect(),
                UNSTRUCTURED_CONFIDENCE,
                Some(UNSTRUCTURED_ALTERNATIVE.to_string()),
            )?),
        }
    }
}
