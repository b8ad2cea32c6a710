use geo_types::{LineString, Point, Rect};

use crate::{ElemId, NULL_ID};

/// A topology node: a point of the planar subdivision.
///
/// A node with no incident edges is *isolated* and records the face whose
/// interior contains it in `containing_face`; any other node carries
/// [`NULL_ID`] there.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub node_id: ElemId,
    pub containing_face: ElemId,
    pub geom: Point<f64>,
}

impl Node {
    /// A node not yet persisted (id assigned by storage on insert).
    pub fn new(geom: Point<f64>, containing_face: ElemId) -> Self {
        Node {
            node_id: NULL_ID,
            containing_face,
            geom,
        }
    }

    /// True if this node has no incident edges.
    pub fn is_isolated(&self) -> bool {
        self.containing_face != NULL_ID
    }
}

/// A topology edge: a simple linestring connecting two nodes.
///
/// `next_left` is the signed identifier of the edge met after this one when
/// walking the boundary of `face_left` (reached at the end node);
/// `next_right` the analogous link for `face_right`, reached at the start
/// node. A positive link walks the referenced edge in its own direction, a
/// negative link against it. A just-inserted isolated edge links to itself:
/// `next_left = -edge_id`, `next_right = edge_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub edge_id: ElemId,
    pub start_node: ElemId,
    pub end_node: ElemId,
    pub face_left: ElemId,
    pub face_right: ElemId,
    pub next_left: ElemId,
    pub next_right: ElemId,
    pub geom: LineString<f64>,
}

impl Edge {
    /// True if the edge starts and ends on the same node.
    pub fn is_closed(&self) -> bool {
        self.start_node == self.end_node
    }

    /// True if the same face lies on both sides (the edge bounds no ring
    /// interior on its own).
    pub fn is_dangling(&self) -> bool {
        self.face_left == self.face_right
    }
}

/// A topology face. The universe face is implicit and never materialized as
/// a `Face` row.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub face_id: ElemId,
    pub mbr: Rect<f64>,
}
