//! Edge splitting: introduce a new node in the interior of an edge,
//! either keeping the original edge for the first half (`mod_edge_split`)
//! or replacing it with two fresh edges (`new_edges_split`).

use geo_types::{LineString, Point};
use log::debug;

use geo_topo_types::{columns, Edge, ElemId, Node, NULL_ID};

use crate::error::{TopoResult, TopologyError};
use crate::kernel;
use crate::storage::{EdgeSelect, EdgeUpdate, TopoEvents, TopoStorage};

use super::Topology;

impl<S: TopoStorage + TopoEvents> Topology<S> {
    /// Fetch the edge and cut its geometry at `pt`.
    fn edge_split_parts(
        &self,
        edge_id: ElemId,
        pt: &Point<f64>,
        skip_checks: bool,
    ) -> TopoResult<(Edge, LineString<f64>, LineString<f64>)> {
        let edge = self.load_edge(edge_id, columns::edge::ALL)?;

        if !skip_checks && self.exists_coincident_node(pt)? {
            return Err(TopologyError::CoincidentNode);
        }

        let (first, second) = kernel::split_line_at_point(&edge.geom, pt.0)
            .ok_or(TopologyError::InvalidGeometry("point not on edge"))?;
        Ok((edge, first, second))
    }

    /// Split an edge at an interior point, keeping the original edge id
    /// for the half on the start-node side. Returns the new node id.
    pub fn mod_edge_split(
        &mut self,
        edge_id: ElemId,
        pt: Point<f64>,
        skip_checks: bool,
    ) -> TopoResult<ElemId> {
        let (old, first, second) = self.edge_split_parts(edge_id, &pt, skip_checks)?;

        let mut nodes = [Node::new(pt, NULL_ID)];
        self.store.insert_nodes(&mut nodes)?;
        let node_id = nodes[0].node_id;

        let new_id = self.store.get_next_edge_id()?;
        let mut new_edges = [Edge {
            edge_id: new_id,
            start_node: node_id,
            end_node: old.end_node,
            face_left: old.face_left,
            face_right: old.face_right,
            next_left: if old.next_left == -old.edge_id {
                -new_id
            } else {
                old.next_left
            },
            next_right: -old.edge_id,
            geom: second,
        }];
        self.store.insert_edges(&mut new_edges)?;

        let n = self.store.update_edges(
            &EdgeSelect {
                edge_id: Some(old.edge_id),
                ..Default::default()
            },
            &EdgeUpdate {
                geom: Some(first),
                next_left: Some(new_id),
                end_node: Some(node_id),
                ..Default::default()
            },
            None,
        )?;
        if n != 1 {
            return Err(TopologyError::CorruptedTopology(format!(
                "{} edges updated when expecting 1 (edge being split)",
                n
            )));
        }

        // Redirect the links that entered the old edge from its end node.
        let exclude_new = EdgeSelect {
            edge_id: Some(new_id),
            ..Default::default()
        };
        self.store.update_edges(
            &EdgeSelect {
                next_right: Some(-old.edge_id),
                start_node: Some(old.end_node),
                ..Default::default()
            },
            &EdgeUpdate {
                next_right: Some(-new_id),
                ..Default::default()
            },
            Some(&exclude_new),
        )?;
        self.store.update_edges(
            &EdgeSelect {
                next_left: Some(-old.edge_id),
                end_node: Some(old.end_node),
                ..Default::default()
            },
            &EdgeUpdate {
                next_left: Some(-new_id),
                ..Default::default()
            },
            Some(&exclude_new),
        )?;

        self.store.on_edge_split(old.edge_id, new_id, None)?;
        debug!(
            "split edge {} at node {}, new edge {}",
            old.edge_id, node_id, new_id
        );
        Ok(node_id)
    }

    /// Split an edge at an interior point, replacing it with two freshly
    /// numbered edges. Returns the new node id.
    pub fn new_edges_split(
        &mut self,
        edge_id: ElemId,
        pt: Point<f64>,
        skip_checks: bool,
    ) -> TopoResult<ElemId> {
        let (old, first, second) = self.edge_split_parts(edge_id, &pt, skip_checks)?;

        let mut nodes = [Node::new(pt, NULL_ID)];
        self.store.insert_nodes(&mut nodes)?;
        let node_id = nodes[0].node_id;

        self.store.delete_edges(&EdgeSelect {
            edge_id: Some(edge_id),
            ..Default::default()
        })?;

        let id0 = self.store.get_next_edge_id()?;
        let id1 = self.store.get_next_edge_id()?;

        let mut new_edges = [
            Edge {
                edge_id: id0,
                start_node: old.start_node,
                end_node: node_id,
                face_left: old.face_left,
                face_right: old.face_right,
                next_left: id1,
                next_right: if old.next_right == edge_id {
                    id0
                } else if old.next_right == -edge_id {
                    -id1
                } else {
                    old.next_right
                },
                geom: first,
            },
            Edge {
                edge_id: id1,
                start_node: node_id,
                end_node: old.end_node,
                face_left: old.face_left,
                face_right: old.face_right,
                next_left: if old.next_left == -edge_id {
                    -id1
                } else if old.next_left == edge_id {
                    id0
                } else {
                    old.next_left
                },
                next_right: -id0,
                geom: second,
            },
        ];
        self.store.insert_edges(&mut new_edges)?;

        // Rewrite every surviving reference to the replaced edge id.
        self.store.update_edges(
            &EdgeSelect {
                next_right: Some(edge_id),
                start_node: Some(old.start_node),
                ..Default::default()
            },
            &EdgeUpdate {
                next_right: Some(id0),
                ..Default::default()
            },
            None,
        )?;
        self.store.update_edges(
            &EdgeSelect {
                next_right: Some(-edge_id),
                start_node: Some(old.end_node),
                ..Default::default()
            },
            &EdgeUpdate {
                next_right: Some(-id1),
                ..Default::default()
            },
            None,
        )?;
        self.store.update_edges(
            &EdgeSelect {
                next_left: Some(edge_id),
                end_node: Some(old.start_node),
                ..Default::default()
            },
            &EdgeUpdate {
                next_left: Some(id0),
                ..Default::default()
            },
            None,
        )?;
        self.store.update_edges(
            &EdgeSelect {
                next_left: Some(-edge_id),
                end_node: Some(old.end_node),
                ..Default::default()
            },
            &EdgeUpdate {
                next_left: Some(-id1),
                ..Default::default()
            },
            None,
        )?;

        self.store.on_edge_split(edge_id, id0, Some(id1))?;
        debug!(
            "split edge {} at node {}, replaced by edges {} and {}",
            edge_id, node_id, id0, id1
        );
        Ok(node_id)
    }
}
