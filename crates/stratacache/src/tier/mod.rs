//! Cache tiers: the bounded in-process store and the remote-store adapter.

mod distributed;
mod memory;

pub use distributed::DistributedTier;
pub use memory::MemoryTier;
