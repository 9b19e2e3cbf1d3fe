//! Slice-transform computation and update pipeline
//!
//! [`SliceComputer`] is the pure math; [`SliceProxy`] is the stateful
//! wrapper wiring it to tool-pose and navigation-context events.

pub mod computer;
pub mod proxy;

pub use computer::{
    ClinicalApplication, FollowType, Orientation, PlaneType, SliceComputer, SlicePlane,
    SlicePlaneDefinition,
};
pub use proxy::{synthetic_tool_pose, NavigationContext, PoseSample, SliceProxy, TrackedTool};
