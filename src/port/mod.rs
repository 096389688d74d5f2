//! Collaborator boundaries.
//!
//! Every trait here is object safe so the application state can hold
//! `Arc<dyn ...>` and tests can swap in the mocks from `test_support`.

pub mod appeal_store;
pub mod classifier;
pub mod ledger_store;
pub mod post_store;
pub mod user_store;

pub use appeal_store::AppealRepository;
pub use classifier::{Classification, LabelScore, TextClassifier};
pub use ledger_store::{ReputationRepository, UserStanding};
pub use post_store::PostStore;
pub use user_store::UserStore;
