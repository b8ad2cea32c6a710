//! Replacing an edge's geometry while preserving topological isomorphism.

use geo::winding_order::Winding;
use geo_types::LineString;
use log::debug;

use geo_topo_types::{columns, ElemId};

use crate::error::{LineEnd, TopoResult, TopologyError};
use crate::kernel::{self, RingPosition};
use crate::storage::{EdgeUpdate, Limit, TopoEvents, TopoStorage};

use super::{edge_mbr, edge_spans_from_line, Topology};

impl<S: TopoStorage + TopoEvents> Topology<S> {
    /// Replace the linestring of an edge, keeping both endpoints exactly.
    ///
    /// The move must be an isomorphism of the topology: the new line may
    /// not cross anything, the swept region may not contain any node, a
    /// closed edge may not flip its winding, and the cyclic order of edge
    /// ends around both endpoints may not change.
    pub fn change_edge_geom(&mut self, edge_id: ElemId, geom: LineString<f64>) -> TopoResult<()> {
        if !kernel::is_simple_line(&geom) {
            return Err(TopologyError::InvalidGeometry("curve not simple"));
        }

        let old = self.load_edge(edge_id, columns::edge::ALL)?;

        if old.geom.0.len() < 2 {
            return Err(TopologyError::CorruptedTopology(format!(
                "edge {} has less than 2 vertices",
                edge_id
            )));
        }
        if geom.0.len() < 2 {
            return Err(TopologyError::InvalidGeometry("less than 2 vertices"));
        }
        let p1 = old.geom.0[0];
        let p2 = old.geom.0[old.geom.0.len() - 1];
        if geom.0[0] != p1 {
            return Err(TopologyError::EndpointNodeMismatch(LineEnd::Start));
        }
        if geom.0[geom.0.len() - 1] != p2 {
            return Err(TopologyError::EndpointNodeMismatch(LineEnd::End));
        }

        let is_closed = old.is_closed();
        if is_closed {
            if kernel::interior_line_point(&geom).is_none() {
                return Err(TopologyError::InvalidGeometry(
                    "no two distinct vertices exist",
                ));
            }
            if old.geom.winding_order() != geom.winding_order() {
                return Err(TopologyError::MotionCollision(format!(
                    "edge twist at node POINT({} {})",
                    p1.x, p1.y
                )));
            }
        }

        self.check_edge_crossing(old.start_node, old.end_node, &geom, Some(edge_id))?;

        // The swept region may not take any node from one side to the
        // other: compare containment against old and new line, both taken
        // as rings closed by the same chord.
        let old_box = edge_mbr(&old.geom)?;
        let new_box = edge_mbr(&geom)?;
        let motion_box = kernel::rect_union(&old_box, &new_box);
        let nodes =
            self.store
                .get_node_within_box(Some(&motion_box), columns::node::ALL, Limit::All)?;
        for n in &nodes {
            if n.node_id == old.start_node || n.node_id == old.end_node {
                continue;
            }
            let in_old = kernel::point_in_ring(&old.geom, n.geom.0) == RingPosition::Inside;
            let in_new = kernel::point_in_ring(&geom, n.geom.0) == RingPosition::Inside;
            if in_old != in_new {
                return Err(TopologyError::MotionCollision(format!(
                    "node at POINT({} {}) changed side",
                    n.geom.x(),
                    n.geom.y()
                )));
            }
        }

        // Edge fan around both endpoints, before the change.
        let (mut span_pre, mut epan_pre) = edge_spans_from_line(&old.geom)?;
        let other = epan_pre;
        self.find_adjacent_edges(
            old.start_node,
            &mut span_pre,
            is_closed.then_some(&other),
            Some(edge_id),
        )?;
        let other = span_pre;
        self.find_adjacent_edges(
            old.end_node,
            &mut epan_pre,
            is_closed.then_some(&other),
            Some(edge_id),
        )?;

        // When this edge is the only constraint on both fans and it
        // separates two faces, fan comparison cannot see a twist of the
        // left ring; capture its winding for an explicit check.
        let left_ring_was_ccw = if !is_closed
            && old.face_left != old.face_right
            && span_pre.next_cw == span_pre.next_ccw
            && epan_pre.next_cw == epan_pre.next_ccw
        {
            Some(self.left_ring_is_ccw(edge_id)?)
        } else {
            None
        };

        let n = self.store.update_edges_by_id(&[(
            edge_id,
            EdgeUpdate {
                geom: Some(geom.clone()),
                ..Default::default()
            },
        )])?;
        if n != 1 {
            return Err(TopologyError::CorruptedTopology(format!(
                "{} edges updated when expecting 1",
                n
            )));
        }

        // Edge fan around both endpoints, after the change.
        let (mut span_post, mut epan_post) = edge_spans_from_line(&geom)?;
        let other = epan_post;
        self.find_adjacent_edges(
            old.start_node,
            &mut span_post,
            is_closed.then_some(&other),
            Some(edge_id),
        )?;
        let other = span_post;
        self.find_adjacent_edges(
            old.end_node,
            &mut epan_post,
            is_closed.then_some(&other),
            Some(edge_id),
        )?;

        if span_pre.next_cw != span_post.next_cw || span_pre.next_ccw != span_post.next_ccw {
            return Err(TopologyError::MotionCollision(format!(
                "edge changed disposition around start node {}",
                old.start_node
            )));
        }
        if epan_pre.next_cw != epan_post.next_cw || epan_pre.next_ccw != epan_post.next_ccw {
            return Err(TopologyError::MotionCollision(format!(
                "edge changed disposition around end node {}",
                old.end_node
            )));
        }

        if let Some(was_ccw) = left_ring_was_ccw {
            if self.left_ring_is_ccw(edge_id)? != was_ccw {
                return Err(TopologyError::MotionCollision(
                    "edge ring changes winding".into(),
                ));
            }
        }

        if old_box != new_box {
            self.refresh_face_mbrs(&[old.face_left, old.face_right])?;
        } else {
            debug!("bbox of edge {} unchanged by geometry change", edge_id);
        }

        Ok(())
    }

    fn left_ring_is_ccw(&self, edge_id: ElemId) -> TopoResult<bool> {
        use geo::winding_order::WindingOrder;
        let ring_edges = self.store.get_ring_edges(edge_id, None)?;
        let shell = self.ring_shell(&ring_edges)?;
        if shell.0.first() != shell.0.last() {
            return Err(TopologyError::CorruptedTopology(format!(
                "ring of edge {} is geometrically not-closed",
                edge_id
            )));
        }
        Ok(shell.winding_order() == Some(WindingOrder::CounterClockwise))
    }
}
