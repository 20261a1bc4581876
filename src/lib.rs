pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod sample;
pub mod sequencer;
pub mod sink;
pub mod source;
pub mod web;
pub mod window;
