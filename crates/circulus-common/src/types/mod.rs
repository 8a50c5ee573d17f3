//! Core data types for the reputation engine

pub mod entity;
pub mod event;
pub mod metrics;
pub mod reputation_score;
