//! Runner game engine: obstacle waves, gate judging, session flow

pub mod layout;
pub mod obstacles;
pub mod physics;
pub mod pool;
pub mod reporter;
pub mod session;
pub mod spawner;

pub use layout::ObstacleKind;
pub use obstacles::{Judgement, ObstacleField};
pub use pool::{HeadlessScene, ObstaclePool, Scene};
pub use reporter::ScoreReporter;
pub use session::{GameSession, SessionEvent, SessionPhase};
