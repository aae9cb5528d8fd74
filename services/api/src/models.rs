//! API models for request and response payloads

pub mod jobs;
pub mod matches;
