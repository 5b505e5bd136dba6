//! Intent classification contract and the per-NPC training policy.
//!
//! The model itself is an external collaborator behind [`IntentClassifier`].
//! [`ClassifierGateway`] owns the trigger policy: when to (re)train, at most
//! one training in flight per NPC, and refusing inference for NPCs that were
//! never trained.

pub mod engine;
pub mod gateway;
pub mod keyword;

pub use engine::{ClassifierError, IntentClassifier, TrainingIntent};
pub use gateway::{ClassifierGateway, TrainingState};
pub use keyword::KeywordClassifier;
