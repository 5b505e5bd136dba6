//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod intent_catalog_repo;
pub mod intent_repo;
pub mod npc_intent_repo;
pub mod npc_repo;
pub mod project_repo;

pub use intent_catalog_repo::IntentCatalogRepo;
pub use intent_repo::IntentRepo;
pub use npc_intent_repo::NpcIntentRepo;
pub use npc_repo::NpcRepo;
pub use project_repo::ProjectRepo;
