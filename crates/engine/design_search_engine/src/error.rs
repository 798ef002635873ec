use core_types::RuleId;

/// Rejections raised before any search work begins.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} = {value} is outside {range}")]
    OutOfRange {
        field: &'static str,
        value: String,
        range: &'static str,
    },
    #[error("{field} must be finite")]
    NonFinite { field: &'static str },
    #[error("inconsistent configuration: {0}")]
    Inconsistent(String),
    #[error("rule set is empty")]
    EmptyRuleSet,
    #[error("duplicate rule id {0}")]
    DuplicateRule(RuleId),
    #[error("invalid rule {id}: {reason}")]
    InvalidRule { id: RuleId, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("trace sink failed: {0}")]
    Sink(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
