//! API handlers module

pub mod auth;
pub mod bookmarks;
pub mod chat;
pub mod health;
pub mod search;
