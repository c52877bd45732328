// crates/core/src/lib.rs
pub mod clock;
pub mod error;
pub mod provider;
pub mod types;

pub use clock::*;
pub use error::*;
pub use provider::*;
pub use types::*;
