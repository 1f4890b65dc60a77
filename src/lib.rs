pub mod align;
pub mod config;
pub mod engine;
pub mod error;
pub mod pose;
pub mod rig;
pub mod source;
pub mod space;
