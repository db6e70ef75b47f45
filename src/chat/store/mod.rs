//! Session store: the authoritative session list.

pub mod session_store;

pub use session_store::{CORRUPT_SUFFIX, SessionStore, decode_sessions};
