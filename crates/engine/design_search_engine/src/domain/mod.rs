pub mod rule;
pub mod state;

pub use rule::{DesignRule, RuleSet, Transformation, apply_rule};
pub use state::{DesignState, Fingerprint};
