mod journal;
mod seed;

pub use journal::{AppealJournal, EventJournal, Journal};
pub use seed::SeedData;
