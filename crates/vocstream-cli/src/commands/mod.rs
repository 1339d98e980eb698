//! CLI command implementations

pub mod doctor;
pub mod inspect;
pub mod json_output;
pub mod transcode;
