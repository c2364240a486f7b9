use serde_json::{Value, json};

use crate::schema::{DecisionInput, MAX_REASONING_ITEMS, MIN_REASONING_ITEMS};

pub const DECISION_OUTPUT_SCHEMA_NAME: &str = "decision_output";

pub fn decision_system_prompt() -> String {
    concat!(
        "You are a practical AI decision assistant.\n",
        "Your job is to HELP the user make a decision, not to refuse.\n\n",
        "Rules you MUST follow:\n",
        "- Always give ONE clear recommendation\n",
        "- Even if context is limited, make reasonable assumptions\n",
        "- NEVER say \"insufficient context\" or ask for more details\n",
        "- Be specific, actionable, and realistic\n",
        "- Do not give generic corporate answers\n\n",
        "Output format MUST strictly match:\n",
        "- recommendation: short and direct\n",
        "- reasoning: 3-5 bullet points\n",
        "- confidence_score: number between 0 and 1\n",
        "- alternative_option: one realistic alternative"
    )
    .to_string()
}

/// The decision input is handed to the model verbatim as JSON.
pub fn build_decision_user_prompt(input: &DecisionInput) -> String {
    serde_json::to_string_pretty(input).unwrap_or_else(|_| {
        json!({
            "decision_type": input.decision_type(),
            "context": input.context(),
        })
        .to_string()
    })
}

pub fn decision_output_json_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "recommendation": { "type": "string" },
            "reasoning": {
                "type": "array",
                "items": { "type": "string" },
                "minItems": MIN_REASONING_ITEMS,
                "maxItems": MAX_REASONING_ITEMS
            },
            "confidence_score": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
            "alternative_option": { "type": ["string", "null"] }
        },
        "required": ["recommendation", "reasoning", "confidence_score", "alternative_option"],
        "additionalProperties": false
    })
}
