// Shared ring types used by nodes and test harnesses
pub mod dht_messages;
pub mod entry;
pub mod id;

pub use entry::{Entry, EntryList};
pub use id::{Id, IdError, DEFAULT_ID_SIZE};
