//! HTTP handlers

pub mod feed;
pub mod health;
pub mod oai;
