pub mod frame;
pub mod keypoint;

pub use frame::PoseFrame;
pub use keypoint::{Keypoint, KeypointIndex, Pose};
