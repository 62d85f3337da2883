pub mod types;
pub mod board;
pub mod drawer;
pub mod fairness;
pub mod round;
pub mod registry;
pub mod caller;

pub use types::*;
pub use board::Board;
pub use drawer::{NumberDrawer, RandomDrawer, ScriptedDrawer};
pub use round::{PlayerState, Round};
pub use registry::RoundRegistry;
pub use caller::{spawn_auto_caller, CallerSummary};
