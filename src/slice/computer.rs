//! Slice-plane computation
//!
//! [`SliceComputer`] derives a 2D cutting-plane basis from a tool pose, a
//! fixed-or-tracked center and a clinical plane definition. It is a pure
//! computation: setters store state, [`SliceComputer::plane`] recomputes
//! from scratch on every call, and no call can fail — a degenerate
//! configuration falls back to a deterministic default basis instead of
//! producing NaNs.

use serde::{Deserialize, Serialize};

use crate::geometry::{
    transform_ijc, transform_point, transform_vector, try_normalize, Transform3, Vector3,
};

/// Named clinical slicing convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaneType {
    /// No plane defined; yields the identity basis
    NoPlane,
    Axial,
    Sagittal,
    Coronal,
    /// Oblique plane containing the tool shaft, gravity-stabilized
    AnyPlane,
    /// Any-plane rotated 90° about the tool shaft
    SidePlane,
    /// Plane perpendicular to the tool shaft
    RadialPlane,
}

/// Whether the basis follows anatomical axes or the tool orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Orthogonal,
    Oblique,
}

/// Whether the plane center tracks the tool or stays at a world point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowType {
    FixedCenter,
    FollowTool,
}

/// Viewing convention selected by the clinical application
///
/// Radiological viewing mirrors the patient's left/right on axial and
/// coronal planes relative to neurological viewing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClinicalApplication {
    Radiological,
    Neurological,
}

/// Complete plane definition as a plain value
///
/// Snapshot of everything that defines a slice view apart from the tool
/// pose and center; applications persist these per view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlicePlaneDefinition {
    pub plane_type: PlaneType,
    pub orientation: Orientation,
    pub follow_type: FollowType,
    pub use_gravity: bool,
    pub gravity_direction: [f64; 3],
    pub use_view_offset: bool,
    pub viewport_height: f64,
    pub view_offset: f64,
}

/// Computed slice plane: orthonormal in-plane basis `i`, `j` and center
/// `c`, all in reference space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlicePlane {
    pub i: Vector3,
    pub j: Vector3,
    pub c: Vector3,
}

impl SlicePlane {
    /// Plane normal, `i × j`
    pub fn normal(&self) -> Vector3 {
        self.i.cross(&self.j)
    }
}

/// Slice-plane calculator
///
/// Owned exclusively by one proxy; all mutation goes through the setters,
/// and [`SliceComputer::plane`] derives the basis lazily.
#[derive(Debug, Clone)]
pub struct SliceComputer {
    clinical_application: ClinicalApplication,
    orientation: Orientation,
    plane_type: PlaneType,
    follow_type: FollowType,
    fixed_center: Vector3,
    /// Tool-to-reference transform (`rMt`)
    tool_position: Transform3,
    /// Offset along the tool shaft projecting the effective tip
    tool_offset: f64,
    use_gravity: bool,
    gravity_direction: Vector3,
    use_view_offset: bool,
    viewport_height: f64,
    view_offset: f64,
}

impl SliceComputer {
    pub fn new() -> Self {
        SliceComputer {
            clinical_application: ClinicalApplication::Radiological,
            orientation: Orientation::Orthogonal,
            plane_type: PlaneType::Axial,
            follow_type: FollowType::FixedCenter,
            fixed_center: Vector3::zeros(),
            tool_position: Transform3::identity(),
            tool_offset: 0.0,
            use_gravity: false,
            gravity_direction: Vector3::new(0.0, 0.0, -1.0),
            use_view_offset: false,
            viewport_height: 1.0,
            view_offset: 0.5,
        }
    }

    /// Establish the canonical configuration for a named plane
    ///
    /// Axial/sagittal/coronal become orthogonal fixed-center planes;
    /// any-plane, side-plane and radial-plane become oblique tool-following
    /// planes with the given gravity and view-offset settings applied.
    #[allow(clippy::too_many_arguments)]
    pub fn initialize_from_plane(
        &mut self,
        plane_type: PlaneType,
        use_gravity: bool,
        gravity_direction: Vector3,
        use_view_offset: bool,
        viewport_height: f64,
        view_offset: f64,
        clinical_application: ClinicalApplication,
    ) {
        self.plane_type = plane_type;
        self.clinical_application = clinical_application;
        match plane_type {
            PlaneType::NoPlane | PlaneType::Axial | PlaneType::Sagittal | PlaneType::Coronal => {
                self.orientation = Orientation::Orthogonal;
                self.follow_type = FollowType::FixedCenter;
                self.set_gravity(false, gravity_direction);
                self.set_tool_view_offset(false, viewport_height, view_offset);
            }
            PlaneType::AnyPlane | PlaneType::SidePlane | PlaneType::RadialPlane => {
                self.orientation = Orientation::Oblique;
                self.follow_type = FollowType::FollowTool;
                self.set_gravity(use_gravity, gravity_direction);
                self.set_tool_view_offset(use_view_offset, viewport_height, view_offset);
            }
        }
    }

    pub fn set_fixed_center(&mut self, center: Vector3) {
        self.fixed_center = center;
    }

    pub fn fixed_center(&self) -> Vector3 {
        self.fixed_center
    }

    /// Set the tool pose in reference space (`rMt`)
    pub fn set_tool_position(&mut self, r_m_t: Transform3) {
        self.tool_position = r_m_t;
    }

    pub fn tool_position(&self) -> Transform3 {
        self.tool_position
    }

    pub fn set_tool_offset(&mut self, offset: f64) {
        self.tool_offset = offset;
    }

    pub fn set_orientation_type(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    pub fn orientation_type(&self) -> Orientation {
        self.orientation
    }

    pub fn set_plane_type(&mut self, plane_type: PlaneType) {
        self.plane_type = plane_type;
    }

    pub fn plane_type(&self) -> PlaneType {
        self.plane_type
    }

    pub fn set_follow_type(&mut self, follow_type: FollowType) {
        self.follow_type = follow_type;
    }

    pub fn follow_type(&self) -> FollowType {
        self.follow_type
    }

    pub fn set_clinical_application(&mut self, app: ClinicalApplication) {
        self.clinical_application = app;
    }

    pub fn set_gravity(&mut self, use_gravity: bool, direction: Vector3) {
        self.use_gravity = use_gravity;
        self.gravity_direction = direction;
    }

    pub fn set_tool_view_offset(
        &mut self,
        use_view_offset: bool,
        viewport_height: f64,
        view_offset: f64,
    ) {
        self.use_view_offset = use_view_offset;
        self.viewport_height = viewport_height;
        self.view_offset = view_offset;
    }

    /// Snapshot the current plane definition
    pub fn definition(&self) -> SlicePlaneDefinition {
        SlicePlaneDefinition {
            plane_type: self.plane_type,
            orientation: self.orientation,
            follow_type: self.follow_type,
            use_gravity: self.use_gravity,
            gravity_direction: [
                self.gravity_direction.x,
                self.gravity_direction.y,
                self.gravity_direction.z,
            ],
            use_view_offset: self.use_view_offset,
            viewport_height: self.viewport_height,
            view_offset: self.view_offset,
        }
    }

    /// Apply a stored plane definition
    pub fn apply_definition(&mut self, def: &SlicePlaneDefinition) {
        self.plane_type = def.plane_type;
        self.orientation = def.orientation;
        self.follow_type = def.follow_type;
        self.use_gravity = def.use_gravity;
        self.gravity_direction = Vector3::new(
            def.gravity_direction[0],
            def.gravity_direction[1],
            def.gravity_direction[2],
        );
        self.use_view_offset = def.use_view_offset;
        self.viewport_height = def.viewport_height;
        self.view_offset = def.view_offset;
    }

    /// Compute the slice plane from the current state
    pub fn plane(&self) -> SlicePlane {
        let (i, j) = self.basis_vectors();

        let mut c = match self.follow_type {
            FollowType::FixedCenter => self.fixed_center,
            FollowType::FollowTool => transform_point(
                &self.tool_position,
                Vector3::new(0.0, 0.0, self.tool_offset),
            ),
        };

        if self.use_view_offset && self.follow_type == FollowType::FollowTool {
            c += j * (self.viewport_height * (0.5 - self.view_offset));
        }

        SlicePlane { i, j, c }
    }

    /// Slice transform `sMr`: reference space into slice space
    pub fn slice_transform(&self) -> Transform3 {
        let plane = self.plane();
        transform_ijc(plane.i, plane.j, plane.c).inverse()
    }

    fn basis_vectors(&self) -> (Vector3, Vector3) {
        match self.orientation {
            Orientation::Orthogonal => self.anatomical_basis(),
            Orientation::Oblique => self.tool_basis(),
        }
    }

    fn anatomical_basis(&self) -> (Vector3, Vector3) {
        // radiological viewing mirrors left/right on axial and coronal
        let lr = match self.clinical_application {
            ClinicalApplication::Radiological => -1.0,
            ClinicalApplication::Neurological => 1.0,
        };
        match self.plane_type {
            PlaneType::Axial => (Vector3::new(lr, 0.0, 0.0), Vector3::new(0.0, -1.0, 0.0)),
            PlaneType::Coronal => (Vector3::new(lr, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0)),
            PlaneType::Sagittal => (Vector3::new(0.0, 1.0, 0.0), Vector3::new(0.0, 0.0, 1.0)),
            _ => (Vector3::x(), Vector3::y()),
        }
    }

    fn tool_basis(&self) -> (Vector3, Vector3) {
        let shaft = transform_vector(&self.tool_position, Vector3::z());
        let up = self.stable_up(shaft);

        // any-plane: contains the shaft, tip toward the top of the view
        let normal = match try_normalize(shaft.cross(&up)) {
            Some(n) => n,
            // up is guaranteed non-parallel by stable_up; identity basis as
            // a last resort so the output is never NaN
            None => return (Vector3::x(), Vector3::y()),
        };
        let j_any = -shaft;
        let i_any = j_any.cross(&normal);

        match self.plane_type {
            PlaneType::SidePlane => {
                // rotated 90° about the shaft: the any-plane i becomes the normal
                let j = -shaft;
                let i = j.cross(&i_any);
                (i, j)
            }
            PlaneType::RadialPlane => {
                // perpendicular to the shaft, looking back along it
                let i = normal;
                let j = (-shaft).cross(&i);
                (i, j)
            }
            // AnyPlane, and the orthogonal types if forced oblique
            _ => (i_any, j_any),
        }
    }

    /// Gravity-stabilized up vector, falling back deterministically when
    /// the preferred direction is parallel to the tool shaft
    fn stable_up(&self, shaft: Vector3) -> Vector3 {
        let mut candidates: Vec<Vector3> = Vec::with_capacity(4);
        if self.use_gravity {
            candidates.push(-self.gravity_direction);
        }
        candidates.push(transform_vector(&self.tool_position, -Vector3::y()));
        candidates.push(Vector3::z());
        candidates.push(Vector3::x());

        for candidate in candidates {
            if let Some(up) = try_normalize(candidate) {
                if try_normalize(shaft.cross(&up)).is_some() {
                    return up;
                }
            }
        }
        Vector3::z()
    }
}

impl Default for SliceComputer {
    fn default() -> Self {
        Self::new()
    }
}
