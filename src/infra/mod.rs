//! Infrastructure adapters for task queues and the key/value store.

pub mod queue;
pub mod store;

pub use queue::InMemoryQueue;
pub use store::InMemoryStore;
