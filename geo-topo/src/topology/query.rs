//! Point-location queries and face geometry assembly.

use geo::winding_order::{Winding, WindingOrder};
use geo_types::{Point, Polygon};
use log::debug;

use geo_topo_types::{columns, ElemId, UNIVERSE_FACE};

use crate::error::{TopoResult, TopologyError};
use crate::kernel;
use crate::storage::{Limit, TopoEvents, TopoStorage};

use super::{EdgeSpan, Topology};

impl<S: TopoStorage + TopoEvents> Topology<S> {
    /// The single node within `tol` of `pt`, if any.
    pub fn get_node_by_point(&self, pt: &Point<f64>, tol: f64) -> TopoResult<Option<ElemId>> {
        let rows = self.store.get_node_within_distance(
            pt,
            tol,
            columns::node::NODE_ID,
            Limit::All,
        )?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(Some(rows[0].node_id)),
            _ => Err(TopologyError::AmbiguousLocation("nodes")),
        }
    }

    /// The single edge within `tol` of `pt`, if any.
    pub fn get_edge_by_point(&self, pt: &Point<f64>, tol: f64) -> TopoResult<Option<ElemId>> {
        let rows = self.store.get_edge_within_distance(
            pt,
            tol,
            columns::edge::EDGE_ID,
            Limit::All,
        )?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(Some(rows[0].edge_id)),
            _ => Err(TopologyError::AmbiguousLocation("edges")),
        }
    }

    /// The face at `pt`. With `tol = 0` this is exact-cover semantics (the
    /// containing-face resolver alone); otherwise edges within tolerance
    /// may vote for an adjacent face. Returns the universe face when the
    /// point is in no finite face.
    pub fn get_face_by_point(&self, pt: &Point<f64>, tol: f64) -> TopoResult<ElemId> {
        let id = self.get_face_containing_point(pt)?;
        if id > 0 || tol == 0.0 {
            return Ok(id);
        }

        debug!("no face properly contains the query point, looking at edges");
        let fields = columns::edge::EDGE_ID
            | columns::edge::GEOM
            | columns::edge::FACE_LEFT
            | columns::edge::FACE_RIGHT;
        let rows = self.store.get_edge_within_distance(pt, tol, fields, Limit::All)?;
        let mut id = id;
        for e in &rows {
            if e.is_dangling() {
                continue;
            }
            let eface = if e.face_left == UNIVERSE_FACE {
                e.face_right
            } else if e.face_right == UNIVERSE_FACE {
                e.face_left
            } else {
                return Err(TopologyError::AmbiguousLocation("faces"));
            };
            if id != UNIVERSE_FACE && id != eface {
                return Err(TopologyError::AmbiguousLocation("faces"));
            }
            id = eface;
        }
        Ok(id)
    }

    /// The face whose interior contains `pt`, by closest-edge analysis.
    ///
    /// Delegates to the storage backend when it has a resolver of its own.
    /// A point sitting on the boundary of several faces is ambiguous; a
    /// point on dangling edges only is resolved to their common face.
    pub fn get_face_containing_point(&self, pt: &Point<f64>) -> TopoResult<ElemId> {
        if let Some(id) = self.store.get_face_containing_point(pt)? {
            return Ok(id);
        }

        let fields = columns::edge::EDGE_ID
            | columns::edge::START_NODE
            | columns::edge::END_NODE
            | columns::edge::FACE_LEFT
            | columns::edge::FACE_RIGHT
            | columns::edge::GEOM;
        let closest = match self.store.get_closest_edge(pt, fields)? {
            // No edges at all: everything is universe.
            None => return Ok(UNIVERSE_FACE),
            Some(e) => e,
        };
        debug!("edge closest to query point is {}", closest.edge_id);

        if closest.face_left < 0 || closest.face_right < 0 {
            return Err(TopologyError::CorruptedTopology(format!(
                "closest edge {} has invalid face on one side",
                closest.edge_id
            )));
        }
        let pts = &closest.geom.0;
        if pts.len() < 2 {
            return Err(TopologyError::CorruptedTopology(format!(
                "geometry of edge {} is collapsed",
                closest.edge_id
            )));
        }

        let hit = kernel::closest_point_on_line(&closest.geom, pt.0)
            .expect("non-collapsed line has a closest point");
        let seg_start = pts[hit.segment];
        let seg_end = pts[hit.segment + 1];

        // Vertex index the closest point coincides with, if any, and the
        // node it may correspond to.
        let (closest_vertex, closest_node) = if hit.fraction <= 0.0 {
            let node = if hit.segment == 0 {
                Some(closest.start_node)
            } else {
                None
            };
            (Some(hit.segment), node)
        } else if hit.fraction >= 1.0 {
            let node = if hit.segment + 2 == pts.len() {
                Some(closest.end_node)
            } else {
                None
            };
            (Some(hit.segment + 1), node)
        } else {
            (None, None)
        };

        if let Some(node) = closest_node {
            if hit.distance == 0.0 {
                // The query point is the node. Only when every incident
                // edge dangles in one face is the answer unambiguous.
                if closest.face_left != closest.face_right {
                    return Err(TopologyError::AmbiguousLocation("faces"));
                }
                let containing = closest.face_left;
                let incident = self.store.get_edge_by_node(
                    &[node],
                    columns::edge::FACE_LEFT | columns::edge::FACE_RIGHT,
                )?;
                if incident.is_empty() {
                    return Err(TopologyError::CorruptedTopology(format!(
                        "no edges incident to node {} of closest edge {}",
                        node, closest.edge_id
                    )));
                }
                for e in &incident {
                    if e.face_left != containing || e.face_right != containing {
                        return Err(TopologyError::AmbiguousLocation("faces"));
                    }
                }
                return Ok(containing);
            }

            // Closest point is a node: the face sits in the clockwise
            // wedge of the node's fan around the direction to the query.
            let az = kernel::azimuth(hit.point, pt.0).expect("distance is non-zero");
            let mut span = EdgeSpan::new(az);
            let found = self.find_adjacent_edges(node, &mut span, None, None)?;
            if found == 0 {
                return Err(TopologyError::CorruptedTopology(format!(
                    "no edges found around node {} of closest edge {}",
                    node, closest.edge_id
                )));
            }
            return Ok(span.cw_face);
        }

        if closest.is_dangling() {
            return Ok(closest.face_left);
        }

        if hit.distance == 0.0 {
            // On the boundary between two distinct faces.
            return Err(TopologyError::AmbiguousLocation("faces"));
        }

        if let Some(v) = closest_vertex {
            // Closest point is an interior vertex: decide the side by
            // which flank of the vertex fan the query direction falls in.
            let prev = if v > 0 { pts[v - 1] } else { pts[pts.len() - 2] };
            let next = if v == pts.len() - 1 { pts[1] } else { pts[v + 1] };
            let az_prev = kernel::azimuth(hit.point, prev).ok_or_else(|| {
                TopologyError::CorruptedTopology("repeated vertex in closest edge".into())
            })?;
            let az_next = kernel::azimuth(hit.point, next).ok_or_else(|| {
                TopologyError::CorruptedTopology("repeated vertex in closest edge".into())
            })?;
            let az_query = kernel::azimuth(hit.point, pt.0).expect("distance is non-zero");
            let wedge = kernel::azimuth_diff(az_next, az_prev);
            let query_angle = kernel::azimuth_diff(az_query, az_prev);
            return Ok(if query_angle < wedge {
                closest.face_left
            } else {
                closest.face_right
            });
        }

        // Closest point is interior to a segment: plain side test.
        match kernel::segment_side(seg_start, seg_end, pt.0) {
            kernel::SegmentSide::Left => Ok(closest.face_left),
            kernel::SegmentSide::Right => Ok(closest.face_right),
            kernel::SegmentSide::On => Err(TopologyError::CorruptedTopology(
                "unexpected collinearity at positive distance".into(),
            )),
        }
    }

    /// Assemble the polygon of a face from its boundary rings: one
    /// counterclockwise shell plus any clockwise holes.
    pub fn face_geometry(&self, face_id: ElemId) -> TopoResult<Polygon<f64>> {
        if face_id == UNIVERSE_FACE {
            return Err(TopologyError::InvalidGeometry(
                "universe face has no geometry",
            ));
        }
        if self
            .store
            .get_face_by_id(&[face_id], columns::face::FACE_ID)?
            .is_empty()
        {
            return Err(TopologyError::NonExistentFace(face_id));
        }

        let edges = self
            .store
            .get_edge_by_face(&[face_id], columns::edge::ALL, None)?;
        if edges.is_empty() {
            return Err(TopologyError::CorruptedTopology(format!(
                "face {} has no boundary edges",
                face_id
            )));
        }

        let mut visited: Vec<ElemId> = Vec::new();
        let mut shells = Vec::new();
        let mut holes = Vec::new();
        for e in &edges {
            for sid in [e.edge_id, -e.edge_id] {
                let bound = if sid > 0 { e.face_left } else { e.face_right };
                if bound != face_id || visited.contains(&sid) {
                    continue;
                }
                let ring_edges = self.store.get_ring_edges(sid, None)?;
                visited.extend_from_slice(&ring_edges);
                let shell = self.ring_shell(&ring_edges)?;
                if shell.0.first() != shell.0.last() {
                    return Err(TopologyError::CorruptedTopology(format!(
                        "ring of edge {} is geometrically not-closed",
                        sid
                    )));
                }
                if shell.winding_order() == Some(WindingOrder::CounterClockwise) {
                    shells.push(shell);
                } else {
                    holes.push(shell);
                }
            }
        }

        match shells.len() {
            1 => Ok(Polygon::new(shells.remove(0), holes)),
            0 => Err(TopologyError::CorruptedTopology(format!(
                "face {} has no shell ring",
                face_id
            ))),
            _ => Err(TopologyError::CorruptedTopology(format!(
                "face {} has multiple shell rings",
                face_id
            ))),
        }
    }
}
