pub mod chat;
pub mod intent;
pub mod npc;
pub mod project;
pub mod voice;
