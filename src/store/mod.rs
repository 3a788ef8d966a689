//! store - persisted state of the handoff handler.
//!
//! - `table`  - общий движок: keyed-таблица строк в одном файле (tmp+rename, fs2 lock)
//! - `clones` - clone tracking store (source serial -> outstanding clone)
//! - `creds`  - host credentials (proxy hosts, storage array login)

pub mod clones;
pub mod creds;
pub mod table;

pub use clones::{CloneRecord, CloneStore};
pub use creds::{CredEntry, CredStore, Credentials};
pub use table::RecordTable;
