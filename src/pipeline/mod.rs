//! Lip-sync pipeline: backend messages in, animated avatar out.

pub mod coordinator;
pub mod messages;
