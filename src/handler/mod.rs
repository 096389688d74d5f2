pub mod admin;
pub mod feed;
pub mod health;
pub mod identity;
pub mod reputation;
