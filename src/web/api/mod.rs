pub mod error;
pub mod pipeline;
pub mod samples;
