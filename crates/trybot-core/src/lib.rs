pub mod artifacts;
pub mod backoff;
pub mod errors;
pub mod ids;
pub mod outcomes;
pub mod types;
pub mod version;

pub use artifacts::*;
pub use backoff::*;
pub use errors::*;
pub use ids::*;
pub use outcomes::*;
pub use types::*;
pub use version::*;
