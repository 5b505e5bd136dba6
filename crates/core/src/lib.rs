//! Domain logic for the talkbox NPC backend.
//!
//! Everything in this crate is free of database and HTTP concerns so it can
//! be unit tested in isolation. Persistence lives in `talkbox-db`, speech
//! synthesis in `talkbox-tts`.

pub mod classifier;
pub mod error;
pub mod paging;
pub mod types;
