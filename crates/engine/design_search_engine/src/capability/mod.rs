pub mod balance;
pub mod collapse;
pub mod generation;
pub mod lambda;
pub mod selection;

pub use balance::{BalanceItem, BalanceOutcome, CategoryBalancer, soft_multipliers};
pub use collapse::{CollapseDetector, CollapseVerdict};
pub use generation::{CandidateGenerator, Generation};
pub use lambda::{LambdaController, LambdaState, format_category_counts, frontier_category_entropy};
pub use selection::{BeamFrontier, BeamSelector};
