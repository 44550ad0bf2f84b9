pub mod log;
pub mod game;
pub mod wallet;
pub mod display;

pub use log::*;
pub use game::*;
pub use wallet::*;
pub use display::*;
