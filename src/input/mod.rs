//! Input processing module
//! Handles file detection, job description extraction, and resume page images

pub mod file_detector;
pub mod text_extractor;
pub mod manager;
pub mod page_image;
