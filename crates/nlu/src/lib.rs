// crates/nlu/src/lib.rs
pub mod classify;
pub mod normalize;
pub mod temporal;

pub use classify::IntentClassifier;
pub use normalize::{normalize, utterance};
pub use temporal::{TemporalResolver, TemporalRule};
