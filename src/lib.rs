// Хранилища (clone tracking + credentials) и их файловый движок
pub mod lock;
pub mod store;  // src/store/{mod,table,clones,creds}.rs

// Конфигурация одного вызова (env + CLI builder)
pub mod config;

// Запечатывание паролей (AES-256-GCM)
pub mod crypto;

// Внешние коллабораторы: массив хранения и proxy-mount helper
pub mod array;  // src/array/{mod,noop,ontap,zapi}.rs
pub mod proxy;  // src/proxy/{mod,vadp}.rs

// Оркестратор жизненного цикла snapshot -> clone -> mount
pub mod handoff; // src/handoff/{mod,outcome,snapshot,clone,mount}.rs

pub mod metrics;

// Удобные реэкспорты
pub use array::{ArrayFault, FaultKind, LunPath, NoopArray, OntapArray, StorageArray};
pub use config::{ArrayConfig, ArrayKind, HandoffConfig};
pub use crypto::SealKey;
pub use handoff::{
    CreateRequest, Handoff, Operation, Outcome, RemoveRequest, EXIT_EINVAL, EXIT_FAILURE, EXIT_OK,
};
pub use proxy::{HelperReport, ProxyMounter, VadpHelper};
pub use store::{CloneRecord, CloneStore, CredStore, Credentials};
