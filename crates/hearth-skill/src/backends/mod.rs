//! Backend implementations of the boundary traits.

pub mod memory;

pub use memory::{LoopbackChannel, MemoryBroker, MemoryConfigStore, MemoryDiscovery};
