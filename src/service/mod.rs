//! API business logic, independent of the HTTP layer

pub mod input;
pub mod publish;
pub mod score;

pub use publish::PublishService;
pub use score::{ScoreOutcome, ScoreService};
