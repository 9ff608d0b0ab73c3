pub mod engine;
pub mod session;
pub mod sources;

pub use engine::{ChatEngine, EngineEvent};
pub use session::{Message, Session};
pub use sources::SourceMap;
