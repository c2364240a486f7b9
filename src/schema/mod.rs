pub mod error;
pub mod types;

pub use error::{FieldViolation, SchemaError};
pub use types::{
    DecisionInput, DecisionOutput, DecisionRequest, DecisionResponse, MAX_REASONING_ITEMS,
    MIN_REASONING_ITEMS,
};
