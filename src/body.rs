//! Read-only view of a posed articulated body, the seam between the editor
//! core and whatever component owns kinematics and meshes. The analysis only
//! ever traverses links; it never mutates the body or keeps a copy of it.

use nalgebra::{Isometry3, Point3, Vector3};

/// Everything the analysis needs to know about one link of the posed body.
/// Mass and inertial offset come from the robot description and may be
/// absent; the vertex buffer may be absent for links without geometry.
/// Vertices are in the link frame, single precision as loaded from the mesh
/// files; link transforms stay double precision and are cast at the boundary.
pub struct LinkState<'a> {
    /// World transform of the link frame.
    pub world_pose: Isometry3<f64>,
    /// Link mass in kilograms, if the description provides one.
    pub mass: Option<f64>,
    /// Offset of the inertial frame origin within the link frame.
    pub inertial_offset: Option<Vector3<f64>>,
    /// Raw mesh vertex buffer of the link, if it has geometry.
    pub vertices: Option<&'a [Point3<f32>]>,
}

/// Traversal interface over the links of a posed body.
pub trait PosedBody {
    fn link_count(&self) -> usize;
    fn link(&self, index: usize) -> LinkState<'_>;
}

/// An owned link used by [`SimpleBody`].
pub struct SimpleLink {
    pub world_pose: Isometry3<f64>,
    pub mass: Option<f64>,
    pub inertial_offset: Option<Vector3<f64>>,
    pub vertices: Vec<Point3<f32>>,
}

/// Owned [`PosedBody`] implementation, used in tests and demos where no
/// external kinematics component is around.
#[derive(Default)]
pub struct SimpleBody {
    pub links: Vec<SimpleLink>,
}

impl PosedBody for SimpleBody {
    fn link_count(&self) -> usize {
        self.links.len()
    }

    fn link(&self, index: usize) -> LinkState<'_> {
        let link = &self.links[index];
        LinkState {
            world_pose: link.world_pose,
            mass: link.mass,
            inertial_offset: link.inertial_offset,
            vertices: if link.vertices.is_empty() {
                None
            } else {
                Some(&link.vertices)
            },
        }
    }
}
