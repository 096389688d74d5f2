mod appeals;
mod ledger;
mod stores;

pub use appeals::MemoryAppealRepository;
pub use ledger::MemoryReputationRepository;
pub use stores::{MemoryPostStore, MemoryUserStore};
