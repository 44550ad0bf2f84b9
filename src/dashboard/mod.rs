pub mod actions;
pub mod input;
pub mod render;
pub mod scheduler;
pub mod state;

pub use input::*;
pub use render::*;
pub use scheduler::*;
pub use state::*;
