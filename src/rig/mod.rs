pub mod derive;
pub mod joint;
pub mod orient;
pub mod skeleton;
pub mod solver;
pub mod stabilize;
pub mod topology;

#[cfg(test)]
pub(crate) mod fixture;

pub use derive::DerivedJoints;
pub use joint::{JointArena, JointId, JointPositions};
pub use skeleton::{AvatarRoot, BonePose, Skeleton};
pub use solver::{SolveReport, Solver};
pub use stabilize::Stabilizer;
pub use topology::{HumanBone, Topology};
