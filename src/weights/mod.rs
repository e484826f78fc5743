//! Decision weights and the feedback loop that tunes them

pub mod decision;
pub mod feedback;

pub use decision::{DecisionWeights, WeightAnalytics, WeightSystem};
pub use feedback::{FeedbackInputs, WeightFeedbackLoop, WeightModifiers};
