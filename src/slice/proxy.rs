//! Slice proxy: tool-pose events in, slice transforms out
//!
//! [`SliceProxy`] bridges an external tool-pose stream and a
//! [`SliceComputer`]. It subscribes to the tool's pose/offset/visibility
//! events and to the navigation context (reference transform, navigation
//! center), recomputes on every relevant change and republishes the new
//! `sMr` through its changed signal.
//!
//! Every pose update triggers a full recompute and publish — there is no
//! coalescing or throttling. Recompute is O(1) vector math; consumers
//! driving heavy rendering must debounce on their side.
//!
//! Tools are owned by an external registry; the proxy holds a weak handle
//! and `set_tool(None)` is the teardown path.

use std::cell::RefCell;
use std::f64::consts::{FRAC_PI_2, PI};
use std::rc::{Rc, Weak};

use crate::event::{Connection, Signal};
use crate::geometry::{rotate_y, rotate_z, translate, Transform3, Vector3};
use crate::slice::computer::{ClinicalApplication, FollowType, Orientation, PlaneType, SliceComputer};

/// One tool-pose sample: `prMt` and the tracker timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    /// Tool-local to patient-reference transform
    pub pr_m_t: Transform3,
    /// Tracker timestamp in milliseconds
    pub timestamp_ms: f64,
}

/// Capability interface for anything that can act as a tracked tool:
/// report its current state and publish changes
pub trait TrackedTool {
    fn uid(&self) -> &str;
    /// Current pose (`prMt`) and timestamp
    fn pose(&self) -> PoseSample;
    /// Configured offset along the tool shaft projecting the effective tip
    fn tooltip_offset(&self) -> f64;
    fn visible(&self) -> bool;
    fn pose_events(&self) -> &Signal<PoseSample>;
    fn tooltip_offset_events(&self) -> &Signal<f64>;
    fn visibility_events(&self) -> &Signal<bool>;
}

/// Shared navigation state, injected where the original design reached
/// into process-wide singletons
///
/// Holds the registration transform `rMpr` (patient reference into
/// navigation reference, mutated rarely) and the current navigation
/// center (e.g. the active volume centroid).
pub struct NavigationContext {
    r_m_pr: RefCell<Transform3>,
    center: RefCell<Vector3>,
    reference_changed: Signal<Transform3>,
    center_changed: Signal<Vector3>,
}

impl NavigationContext {
    pub fn new() -> Rc<Self> {
        Rc::new(NavigationContext {
            r_m_pr: RefCell::new(Transform3::identity()),
            center: RefCell::new(Vector3::zeros()),
            reference_changed: Signal::new(),
            center_changed: Signal::new(),
        })
    }

    pub fn reference_transform(&self) -> Transform3 {
        *self.r_m_pr.borrow()
    }

    /// Update `rMpr` (registration); notifies all listeners
    pub fn set_reference_transform(&self, r_m_pr: Transform3) {
        *self.r_m_pr.borrow_mut() = r_m_pr;
        self.reference_changed.emit(&r_m_pr);
    }

    pub fn center(&self) -> Vector3 {
        *self.center.borrow()
    }

    /// Update the navigation center; notifies all listeners
    pub fn set_center(&self, center: Vector3) {
        *self.center.borrow_mut() = center;
        self.center_changed.emit(&center);
    }

    pub fn reference_changed(&self) -> &Signal<Transform3> {
        &self.reference_changed
    }

    pub fn center_changed(&self) -> &Signal<Vector3> {
        &self.center_changed
    }
}

/// The deterministic pose used when no tool is attached: a canonical
/// "looking down" orientation at the given center
pub fn synthetic_tool_pose(center: Vector3) -> Transform3 {
    translate(center) * rotate_y(PI) * rotate_z(FRAC_PI_2)
}

struct ToolBinding {
    tool: Weak<dyn TrackedTool>,
    pose_conn: Connection,
    offset_conn: Connection,
    visibility_conn: Connection,
}

impl ToolBinding {
    fn disconnect(&self) {
        if let Some(tool) = self.tool.upgrade() {
            tool.pose_events().disconnect(self.pose_conn);
            tool.tooltip_offset_events().disconnect(self.offset_conn);
            tool.visibility_events().disconnect(self.visibility_conn);
        }
    }
}

struct Inner {
    computer: SliceComputer,
    context: Rc<NavigationContext>,
    tool: Option<ToolBinding>,
    default_center: Vector3,
    always_use_default_center: bool,
    use_tooltip_offset: bool,
}

impl Inner {
    fn tool_handle(&self) -> Option<Rc<dyn TrackedTool>> {
        self.tool.as_ref().and_then(|binding| binding.tool.upgrade())
    }

    /// Re-derive the fixed center (and, with no tool, the synthetic pose)
    fn update_center(&mut self) {
        if self.always_use_default_center {
            self.computer.set_fixed_center(self.default_center);
        } else if self.tool_handle().is_some() {
            self.computer.set_fixed_center(self.context.center());
        } else {
            // no tool: freeze to the default center and force a
            // deterministic pose so the view stays reproducible
            self.computer.set_fixed_center(self.default_center);
            self.computer
                .set_tool_position(synthetic_tool_pose(self.default_center));
        }
    }
}

/// Stateful slice-transform publisher
///
/// Single-owner, single-threaded: all recompute and publish happens
/// synchronously on the thread delivering the events.
pub struct SliceProxy {
    inner: Rc<RefCell<Inner>>,
    changed: Rc<Signal<Transform3>>,
    reference_conn: Connection,
    center_conn: Connection,
}

impl SliceProxy {
    pub fn new(context: Rc<NavigationContext>) -> Self {
        let inner = Rc::new(RefCell::new(Inner {
            computer: SliceComputer::new(),
            context: context.clone(),
            tool: None,
            default_center: Vector3::zeros(),
            always_use_default_center: false,
            use_tooltip_offset: true,
        }));
        let changed = Rc::new(Signal::new());

        let weak = Rc::downgrade(&inner);
        let weak_changed = Rc::downgrade(&changed);
        let reference_conn = context.reference_changed().connect(move |_| {
            if let (Some(inner), Some(changed)) = (weak.upgrade(), weak_changed.upgrade()) {
                // rMt is cached inside the computer, so re-apply the
                // current tool pose under the new registration
                let sample = inner
                    .borrow()
                    .tool_handle()
                    .map(|tool| tool.pose());
                if let Some(sample) = sample {
                    Self::apply_pose(&inner, &sample);
                }
                Self::emit(&inner, &changed);
            }
        });

        let weak = Rc::downgrade(&inner);
        let weak_changed = Rc::downgrade(&changed);
        let center_conn = context.center_changed().connect(move |_| {
            if let (Some(inner), Some(changed)) = (weak.upgrade(), weak_changed.upgrade()) {
                inner.borrow_mut().update_center();
                Self::emit(&inner, &changed);
            }
        });

        // no tool yet: start from the deterministic fallback pose
        inner.borrow_mut().update_center();

        SliceProxy {
            inner,
            changed,
            reference_conn,
            center_conn,
        }
    }

    /// Configure the computer for a named plane, then republish
    #[allow(clippy::too_many_arguments)]
    pub fn initialize_from_plane(
        &self,
        plane_type: PlaneType,
        use_gravity: bool,
        gravity_direction: Vector3,
        use_view_offset: bool,
        viewport_height: f64,
        view_offset: f64,
        clinical_application: ClinicalApplication,
    ) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.computer.initialize_from_plane(
                plane_type,
                use_gravity,
                gravity_direction,
                use_view_offset,
                viewport_height,
                view_offset,
                clinical_application,
            );
            inner.update_center();
        }
        Self::emit(&self.inner, &self.changed);
    }

    /// Attach a tool (or detach with `None`)
    ///
    /// Unsubscribes from the previous tool, subscribes to the new one,
    /// synchronizes immediately with the tool's current pose, re-evaluates
    /// the center policy and fires the changed event.
    pub fn set_tool(&self, tool: Option<Rc<dyn TrackedTool>>) {
        if let Some(binding) = self.inner.borrow_mut().tool.take() {
            binding.disconnect();
        }

        if let Some(tool) = tool {
            let weak_inner = Rc::downgrade(&self.inner);
            let weak_changed = Rc::downgrade(&self.changed);
            let pose_conn = tool.pose_events().connect(move |sample| {
                if let (Some(inner), Some(changed)) =
                    (weak_inner.upgrade(), weak_changed.upgrade())
                {
                    Self::apply_pose(&inner, sample);
                    Self::emit(&inner, &changed);
                }
            });

            let weak_inner = Rc::downgrade(&self.inner);
            let weak_changed = Rc::downgrade(&self.changed);
            let offset_conn = tool.tooltip_offset_events().connect(move |offset| {
                if let (Some(inner), Some(changed)) =
                    (weak_inner.upgrade(), weak_changed.upgrade())
                {
                    let enabled = inner.borrow().use_tooltip_offset;
                    if enabled {
                        inner.borrow_mut().computer.set_tool_offset(*offset);
                        Self::emit(&inner, &changed);
                    }
                }
            });

            let weak_inner = Rc::downgrade(&self.inner);
            let weak_changed = Rc::downgrade(&self.changed);
            let visibility_conn = tool.visibility_events().connect(move |_| {
                // geometry is unchanged but consumers may need to redraw
                if let (Some(inner), Some(changed)) =
                    (weak_inner.upgrade(), weak_changed.upgrade())
                {
                    Self::emit(&inner, &changed);
                }
            });

            // initial sync with the tool's current state; avoids a
            // stale-transform window until the first pose event
            let sample = tool.pose();
            let offset = tool.tooltip_offset();
            {
                let mut inner = self.inner.borrow_mut();
                inner.tool = Some(ToolBinding {
                    tool: Rc::downgrade(&tool),
                    pose_conn,
                    offset_conn,
                    visibility_conn,
                });
                if inner.use_tooltip_offset {
                    inner.computer.set_tool_offset(offset);
                }
            }
            Self::apply_pose(&self.inner, &sample);
        }

        self.inner.borrow_mut().update_center();
        Self::emit(&self.inner, &self.changed);
    }

    /// Feed a pose update directly, outside the event subscription
    ///
    /// Same path the pose-event slot takes; useful for sources that are
    /// polled rather than event-driven.
    pub fn tool_transform_updated(&self, sample: PoseSample) {
        Self::apply_pose(&self.inner, &sample);
        Self::emit(&self.inner, &self.changed);
    }

    /// Default center used when no tool (or always) supplies the center
    pub fn set_default_center(&self, center: Vector3) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.default_center = center;
            inner.update_center();
        }
        Self::emit(&self.inner, &self.changed);
    }

    /// Force the default center even while a tool is attached
    pub fn set_always_use_default_center(&self, always: bool) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.always_use_default_center = always;
            inner.update_center();
        }
        Self::emit(&self.inner, &self.changed);
    }

    /// Opt this proxy out of tooltip-offset updates
    ///
    /// Several proxies may share one tool but want different offset
    /// behavior; disabling leaves the computer's offset untouched.
    pub fn set_use_tooltip_offset(&self, use_offset: bool) {
        self.inner.borrow_mut().use_tooltip_offset = use_offset;
    }

    pub fn set_orientation_type(&self, orientation: Orientation) {
        self.inner.borrow_mut().computer.set_orientation_type(orientation);
        Self::emit(&self.inner, &self.changed);
    }

    pub fn set_plane_type(&self, plane_type: PlaneType) {
        self.inner.borrow_mut().computer.set_plane_type(plane_type);
        Self::emit(&self.inner, &self.changed);
    }

    pub fn set_follow_type(&self, follow_type: FollowType) {
        self.inner.borrow_mut().computer.set_follow_type(follow_type);
        Self::emit(&self.inner, &self.changed);
    }

    pub fn set_gravity(&self, use_gravity: bool, direction: Vector3) {
        self.inner.borrow_mut().computer.set_gravity(use_gravity, direction);
        Self::emit(&self.inner, &self.changed);
    }

    pub fn set_tool_view_offset(
        &self,
        use_view_offset: bool,
        viewport_height: f64,
        view_offset: f64,
    ) {
        self.inner
            .borrow_mut()
            .computer
            .set_tool_view_offset(use_view_offset, viewport_height, view_offset);
        Self::emit(&self.inner, &self.changed);
    }

    /// Snapshot of the computer state, for cloning proxies
    pub fn computer(&self) -> SliceComputer {
        self.inner.borrow().computer.clone()
    }

    /// Transplant a complete computer configuration, then republish
    pub fn set_computer(&self, computer: SliceComputer) {
        self.inner.borrow_mut().computer = computer;
        Self::emit(&self.inner, &self.changed);
    }

    /// True while a live tool is attached
    pub fn has_tool(&self) -> bool {
        self.inner.borrow().tool_handle().is_some()
    }

    /// Current slice transform, recomputed on demand
    ///
    /// Not cached: computer state may have changed without a signal having
    /// fired yet, and this must always reflect the present state.
    pub fn s_m_r(&self) -> Transform3 {
        self.inner.borrow().computer.slice_transform()
    }

    /// Subscribe to slice-transform changes
    pub fn connect_changed(&self, slot: impl Fn(&Transform3) + 'static) -> Connection {
        self.changed.connect(slot)
    }

    pub fn disconnect_changed(&self, conn: Connection) {
        self.changed.disconnect(conn);
    }

    fn apply_pose(inner: &Rc<RefCell<Inner>>, sample: &PoseSample) {
        let mut inner = inner.borrow_mut();
        let r_m_pr = inner.context.reference_transform();
        inner.computer.set_tool_position(r_m_pr * sample.pr_m_t);
    }

    fn emit(inner: &Rc<RefCell<Inner>>, changed: &Signal<Transform3>) {
        // compute before emitting so slots can re-enter the proxy
        let s_m_r = inner.borrow().computer.slice_transform();
        changed.emit(&s_m_r);
    }
}

impl Drop for SliceProxy {
    fn drop(&mut self) {
        if let Some(binding) = self.inner.borrow_mut().tool.take() {
            binding.disconnect();
        }
        let context = self.inner.borrow().context.clone();
        context.reference_changed().disconnect(self.reference_conn);
        context.center_changed().disconnect(self.center_conn);
    }
}
