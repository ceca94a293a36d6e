pub mod config;
pub mod doctor;
pub mod runner;
pub mod util;

pub use config::*;
pub use doctor::*;
pub use runner::*;
pub use util::*;
