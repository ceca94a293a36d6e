pub mod fetch;
pub mod install;
pub mod settings;
pub mod steps;
pub mod unpack;

pub use fetch::*;
pub use install::*;
pub use settings::*;
pub use steps::*;
pub use unpack::*;
