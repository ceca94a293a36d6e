pub mod clock;
pub mod poller;
pub mod settings;
pub mod status;
pub mod submit;

pub use clock::*;
pub use poller::*;
pub use settings::*;
pub use status::*;
pub use submit::*;
