//! Crossing analysis between a candidate edge geometry and the existing
//! topology.
//!
//! The classifier distinguishes, with the endpoint boundary rule, the same
//! intersection categories the SQL/MM checks name: coincident lines,
//! 1-dimensional interior overlap, 0-dimensional interior crossing, and an
//! endpoint of one line touching the other's interior. Boundary-boundary
//! contact (edges meeting at nodes) is legitimate and ignored.

use geo::line_intersection::{line_intersection, LineIntersection};
use geo_types::{Coord, LineString};
use log::debug;

use geo_topo_types::{columns, ElemId};

use crate::error::{TopoResult, TopologyError};
use crate::kernel;
use crate::storage::{Limit, TopoEvents, TopoStorage};

use super::{edge_mbr, Topology};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CrossKind {
    None,
    Coincident,
    InteriorOverlap,
    InteriorCross,
    BoundaryOnInterior,
}

/// Classify how `candidate` meets `existing`.
pub(crate) fn classify_crossing(
    candidate: &LineString<f64>,
    existing: &LineString<f64>,
) -> CrossKind {
    if kernel::lines_equal(candidate, existing).is_some() {
        return CrossKind::Coincident;
    }

    let boundary = |line: &LineString<f64>, p: Coord<f64>| {
        p == line.0[0] || p == line.0[line.0.len() - 1]
    };

    let mut cross = false;
    let mut touch = false;
    for se in existing.lines() {
        for sc in candidate.lines() {
            match line_intersection(se, sc) {
                None => {}
                Some(LineIntersection::Collinear { intersection }) => {
                    if intersection.start != intersection.end {
                        return CrossKind::InteriorOverlap;
                    }
                    let p = intersection.start;
                    if !boundary(candidate, p) && !boundary(existing, p) {
                        cross = true;
                    } else if boundary(candidate, p) != boundary(existing, p) {
                        touch = true;
                    }
                }
                Some(LineIntersection::SinglePoint { intersection: p, .. }) => {
                    let cb = boundary(candidate, p);
                    let eb = boundary(existing, p);
                    if !cb && !eb {
                        cross = true;
                    } else if cb != eb {
                        touch = true;
                    }
                }
            }
        }
    }
    if cross {
        CrossKind::InteriorCross
    } else if touch {
        CrossKind::BoundaryOnInterior
    } else {
        CrossKind::None
    }
}

impl<S: TopoStorage + TopoEvents> Topology<S> {
    /// Reject a candidate edge geometry that would cross a node or have a
    /// non-boundary intersection with an existing edge. `my_edge` names an
    /// edge to ignore (geometry replacement).
    pub(crate) fn check_edge_crossing(
        &self,
        start_node: ElemId,
        end_node: ElemId,
        geom: &LineString<f64>,
        my_edge: Option<ElemId>,
    ) -> TopoResult<()> {
        let bbox = edge_mbr(geom)?;

        let nodes = self
            .store
            .get_node_within_box(Some(&bbox), columns::node::ALL, Limit::All)?;
        debug!("crossing check against {} nodes in box", nodes.len());
        for node in &nodes {
            if node.node_id == start_node || node.node_id == end_node {
                continue;
            }
            if kernel::point_on_line(geom, node.geom.0) {
                return Err(TopologyError::EdgeCrossesNode);
            }
        }

        let edges = self
            .store
            .get_edge_within_box(Some(&bbox), columns::edge::ALL, Limit::All)?;
        debug!("crossing check against {} edges in box", edges.len());
        for edge in &edges {
            if Some(edge.edge_id) == my_edge {
                continue;
            }
            if edge.geom.0.is_empty() {
                return Err(TopologyError::CorruptedTopology(format!(
                    "edge {} has null geometry",
                    edge.edge_id
                )));
            }
            match classify_crossing(geom, &edge.geom) {
                CrossKind::None => {}
                CrossKind::Coincident => {
                    return Err(TopologyError::CoincidentEdge(edge.edge_id))
                }
                CrossKind::InteriorOverlap => {
                    return Err(TopologyError::EdgeIntersectsEdge(edge.edge_id))
                }
                CrossKind::InteriorCross => {
                    return Err(TopologyError::EdgeCrossesEdge(edge.edge_id))
                }
                CrossKind::BoundaryOnInterior => {
                    return Err(TopologyError::EdgeTouchesEdgeInterior(edge.edge_id))
                }
            }
        }
        Ok(())
    }
}
