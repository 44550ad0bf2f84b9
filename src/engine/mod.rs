pub mod controller;
pub mod inference;

pub use controller::*;
pub use inference::*;
