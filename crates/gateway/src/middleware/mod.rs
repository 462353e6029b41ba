//! Request plumbing shared by handlers

pub mod rate_limit;
