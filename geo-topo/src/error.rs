use std::fmt;

use geo_topo_types::ElemId;

use crate::storage::StorageError;

/// Which end of an edge geometry failed a consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnd {
    Start,
    End,
}

/// Errors raised by topology operations.
///
/// Primitive operations propagate the first error encountered; when an error
/// is returned the backing storage must roll back any writes the operation
/// performed.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    /// A node already exists at the given position.
    CoincidentNode,
    /// The given point lies in the interior of an existing edge.
    EdgeCrossesNode,
    /// The candidate line coincides with the given existing edge.
    CoincidentEdge(ElemId),
    /// The candidate line shares a 1-dimensional piece of its interior with
    /// the given existing edge.
    EdgeIntersectsEdge(ElemId),
    /// The candidate line's interior crosses the given existing edge's
    /// interior in a point.
    EdgeCrossesEdge(ElemId),
    /// An endpoint of one line lies in the interior of the other.
    EdgeTouchesEdgeInterior(ElemId),
    /// An edge geometry does not begin/end at its endpoint node's position.
    EndpointNodeMismatch(LineEnd),
    /// The operation requires an isolated node.
    NonIsolatedNode,
    /// No node with this identifier exists.
    NonExistentNode(ElemId),
    /// No edge with this identifier exists.
    NonExistentEdge(ElemId),
    /// No face with this identifier exists.
    NonExistentFace(ElemId),
    /// The given point does not lie inside the requested face.
    NotWithinFace,
    /// The endpoints of a candidate isolated edge lie in different faces.
    NodesInDifferentFaces,
    /// The two ends of a candidate edge resolve to different faces.
    SideLocationConflict(ElemId, ElemId),
    /// The input geometry is unusable for the operation (empty, collapsed,
    /// non-simple, or similar); the payload says which way.
    InvalidGeometry(&'static str),
    /// An edge geometry change would move the edge across a node, twist a
    /// closed edge's winding, or reorder the edge fans at its endpoints.
    MotionCollision(String),
    /// The operation requires an edge with the same face on both sides.
    EdgeNotDangling,
    /// Two edges cannot heal: an empty list means they share no node, a
    /// non-empty list holds the other edges incident to the shared node.
    HealDegreeMismatch(Vec<ElemId>),
    /// More than one element (of the named kind) matched a point query.
    AmbiguousLocation(&'static str),
    /// An invariant did not hold on data read back from storage. Fatal for
    /// the operation.
    CorruptedTopology(String),
    /// The storage backend failed; the message is forwarded verbatim.
    Storage(String),
    /// The operation observed a cancellation request and stopped before
    /// performing further writes.
    Cancelled,
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TopologyError::*;
        match self {
            CoincidentNode => write!(f, "coincident node"),
            EdgeCrossesNode => write!(f, "geometry crosses a node"),
            CoincidentEdge(id) => write!(f, "coincident edge {}", id),
            EdgeIntersectsEdge(id) => write!(f, "geometry intersects edge {}", id),
            EdgeCrossesEdge(id) => write!(f, "geometry crosses edge {}", id),
            EdgeTouchesEdgeInterior(id) => {
                write!(f, "geometry boundary touches interior of edge {}", id)
            }
            EndpointNodeMismatch(LineEnd::Start) => {
                write!(f, "start node not geometry start point")
            }
            EndpointNodeMismatch(LineEnd::End) => write!(f, "end node not geometry end point"),
            NonIsolatedNode => write!(f, "not isolated node"),
            NonExistentNode(id) => write!(f, "non-existent node {}", id),
            NonExistentEdge(id) => write!(f, "non-existent edge {}", id),
            NonExistentFace(id) => write!(f, "non-existent face {}", id),
            NotWithinFace => write!(f, "not within face"),
            NodesInDifferentFaces => write!(f, "nodes in different faces"),
            SideLocationConflict(a, b) => write!(
                f,
                "side-location conflict: new edge starts in face {} and ends in face {}",
                a, b
            ),
            InvalidGeometry(what) => write!(f, "invalid geometry: {}", what),
            MotionCollision(what) => write!(f, "edge motion collision: {}", what),
            EdgeNotDangling => write!(f, "not isolated edge"),
            HealDegreeMismatch(others) => {
                if others.is_empty() {
                    write!(f, "non-connected edges")
                } else {
                    write!(f, "other edges connected (")?;
                    for (i, id) in others.iter().enumerate() {
                        if i > 0 {
                            write!(f, ",")?;
                        }
                        write!(f, "{}", id)?;
                    }
                    write!(f, ")")
                }
            }
            AmbiguousLocation(kind) => write!(f, "two or more {} found", kind),
            CorruptedTopology(what) => write!(f, "corrupted topology: {}", what),
            Storage(msg) => write!(f, "storage backend error: {}", msg),
            Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for TopologyError {}

impl From<StorageError> for TopologyError {
    fn from(e: StorageError) -> Self {
        TopologyError::Storage(e.to_string())
    }
}

/// Convenience alias used by every fallible engine operation.
pub type TopoResult<T> = Result<T, TopologyError>;
