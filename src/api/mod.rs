//! HTTP handlers

pub mod admin;
pub mod chat;
pub mod health;
pub mod pods;
pub mod sessions;
