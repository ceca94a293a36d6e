pub mod runner;
pub mod scripted;
pub mod system;

pub use runner::*;
pub use scripted::*;
pub use system::*;
