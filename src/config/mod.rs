pub mod runtime;
pub mod editor;
pub mod strategy;

pub use runtime::*;
pub use editor::*;
pub use strategy::*;
