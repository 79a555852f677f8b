//! Route handlers organized by domain.

pub mod auth;
pub mod chat;
pub mod health;
pub mod users;
pub mod ws;
