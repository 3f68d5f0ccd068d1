//! Screening pipelines: single-resume analysis and bulk ranking

pub mod candidate;
pub mod throttle;
pub mod batch;
pub mod analyzer;
