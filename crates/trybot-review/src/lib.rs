pub mod checkout;
pub mod lock;
pub mod manifest;
pub mod patch_id;
pub mod settings;
pub mod toolchain;

pub use checkout::*;
pub use lock::*;
pub use manifest::*;
pub use patch_id::*;
pub use settings::*;
pub use toolchain::*;
