pub mod config;
pub mod follow;
pub mod history;
pub mod unread;
