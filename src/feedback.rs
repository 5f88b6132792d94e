mod graph;
mod value;

pub use graph::FeedbackGraph;
pub use value::{BoolFeedback, Feedback, IntFeedback, StringFeedback, SubscriptionId};
