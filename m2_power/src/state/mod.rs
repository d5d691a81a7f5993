pub mod machine;
pub mod model;

pub use machine::{transition, SystemEvent, SystemState};
pub use model::Model;
