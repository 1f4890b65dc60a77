pub mod landmark;

pub use landmark::{Landmark, LandmarkFrame, LandmarkIndex, PoseFrame};
