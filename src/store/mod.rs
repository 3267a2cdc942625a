//! Flat-file persistence for keys, signatures, digests and sealed blocks.

pub mod entries;
pub mod file;
pub mod memory;
pub mod traits;

pub use entries::{get_entry, put_entry};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::{validate_name, TextStore};
