//! External collaborators module
//!
//! The key-value store holding timer state, the WhatsApp messenger, and the
//! delayed callback scheduler, each behind a trait so they can be swapped.

pub mod alert;
pub mod memory_store;
pub mod messenger;
pub mod scheduler;
pub mod store;
pub mod upstash;

// Re-export main types
pub use alert::Alerter;
pub use memory_store::MemoryStore;
pub use messenger::{Messenger, WhatsAppMessenger};
pub use scheduler::{DelayScheduler, LocalScheduler, QStashScheduler, ScheduleToken};
pub use store::{KvOp, KvStore};
pub use upstash::UpstashStore;
