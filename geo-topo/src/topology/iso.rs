//! Isolated element primitives: nodes with no incident edges, and edges
//! whose endpoints have no other incident edges.

use geo_types::{LineString, Point};
use log::debug;

use geo_topo_types::{columns, Edge, ElemId, Node, NULL_ID, UNIVERSE_FACE};

use crate::error::{LineEnd, TopoResult, TopologyError};
use crate::kernel;
use crate::storage::{Limit, NodeUpdate, TopoEvents, TopoStorage};

use super::Topology;

impl<S: TopoStorage + TopoEvents> Topology<S> {
    pub(crate) fn exists_coincident_node(&self, pt: &Point<f64>) -> TopoResult<bool> {
        let rows = self.store.get_node_within_distance(
            pt,
            0.0,
            columns::node::NODE_ID,
            Limit::Existence,
        )?;
        Ok(!rows.is_empty())
    }

    pub(crate) fn exists_edge_intersecting_point(&self, pt: &Point<f64>) -> TopoResult<bool> {
        let rows = self.store.get_edge_within_distance(
            pt,
            0.0,
            columns::edge::EDGE_ID,
            Limit::Existence,
        )?;
        Ok(!rows.is_empty())
    }

    /// Insert a node lying strictly inside `face`.
    ///
    /// Pass `face = -1` to have the containing face resolved by the engine.
    /// With `skip_checks` the coincidence, edge-crossing and face
    /// containment validations are bypassed. Returns the new node id.
    pub fn add_iso_node(
        &mut self,
        face: ElemId,
        pt: Point<f64>,
        skip_checks: bool,
    ) -> TopoResult<ElemId> {
        self.add_iso_node_impl(face, pt, skip_checks, true)
    }

    pub(crate) fn add_iso_node_impl(
        &mut self,
        face: ElemId,
        pt: Point<f64>,
        skip_checks: bool,
        check_face: bool,
    ) -> TopoResult<ElemId> {
        if !skip_checks {
            if self.exists_coincident_node(&pt)? {
                return Err(TopologyError::CoincidentNode);
            }
            if self.exists_edge_intersecting_point(&pt)? {
                return Err(TopologyError::EdgeCrossesNode);
            }
        }

        let mut found_in_face = NULL_ID;
        if check_face && (face == NULL_ID || !skip_checks) {
            found_in_face = self.get_face_containing_point(&pt)?;
        }

        let face = if face == NULL_ID {
            found_in_face
        } else {
            if !skip_checks && found_in_face != face {
                return Err(TopologyError::NotWithinFace);
            }
            face
        };

        let mut nodes = [Node::new(pt, face)];
        self.store.insert_nodes(&mut nodes)?;
        debug!("added isolated node {} in face {}", nodes[0].node_id, face);
        Ok(nodes[0].node_id)
    }

    fn load_iso_node(&self, node_id: ElemId) -> TopoResult<Node> {
        let node = self.load_node(node_id, columns::node::ALL)?;
        if !node.is_isolated() {
            return Err(TopologyError::NonIsolatedNode);
        }
        Ok(node)
    }

    /// Move an isolated node. The new position must not coincide with a
    /// node, must not lie on an edge, and must stay inside the node's
    /// containing face.
    pub fn move_iso_node(&mut self, node_id: ElemId, pt: Point<f64>) -> TopoResult<()> {
        let node = self.load_iso_node(node_id)?;

        if self.exists_coincident_node(&pt)? {
            return Err(TopologyError::CoincidentNode);
        }
        if self.exists_edge_intersecting_point(&pt)? {
            return Err(TopologyError::EdgeCrossesNode);
        }

        let new_face = self.get_face_containing_point(&pt)?;
        if node.containing_face != new_face {
            return Err(TopologyError::NotWithinFace);
        }

        self.store.update_nodes_by_id(&[(
            node_id,
            NodeUpdate {
                geom: Some(pt),
                ..Default::default()
            },
        )])?;
        Ok(())
    }

    /// Remove an isolated node.
    pub fn remove_iso_node(&mut self, node_id: ElemId) -> TopoResult<()> {
        self.load_iso_node(node_id)?;
        self.store.check_remove_iso_node(node_id)?;
        let n = self.store.delete_nodes_by_id(&[node_id])?;
        if n != 1 {
            return Err(TopologyError::CorruptedTopology(format!(
                "{} nodes deleted when expecting 1",
                n
            )));
        }
        Ok(())
    }

    /// Add an edge between two isolated nodes lying in the same face.
    ///
    /// The line must be simple, start and end exactly on the given nodes,
    /// and stay clear of every other node and edge. Both endpoints stop
    /// being isolated. Returns the new edge id.
    pub fn add_iso_edge(
        &mut self,
        start_node: ElemId,
        end_node: ElemId,
        geom: LineString<f64>,
    ) -> TopoResult<ElemId> {
        // A closed edge is never isolated, as it forms a face.
        if start_node == end_node {
            return Err(TopologyError::InvalidGeometry(
                "closed edges would not be isolated",
            ));
        }
        if !kernel::is_simple_line(&geom) {
            return Err(TopologyError::InvalidGeometry("curve not simple"));
        }

        let nodes = self
            .store
            .get_node_by_id(&[start_node, end_node], columns::node::ALL)?;
        if nodes.len() < 2 {
            let missing = if nodes.iter().any(|n| n.node_id == start_node) {
                end_node
            } else {
                start_node
            };
            return Err(TopologyError::NonExistentNode(missing));
        }

        let mut containing_face = NULL_ID;
        for node in &nodes {
            if !node.is_isolated() {
                return Err(TopologyError::NonIsolatedNode);
            }
            if containing_face == NULL_ID {
                containing_face = node.containing_face;
            } else if containing_face != node.containing_face {
                return Err(TopologyError::NodesInDifferentFaces);
            }

            if node.node_id == start_node {
                if geom.0[0] != node.geom.0 {
                    return Err(TopologyError::EndpointNodeMismatch(LineEnd::Start));
                }
            } else if geom.0[geom.0.len() - 1] != node.geom.0 {
                return Err(TopologyError::EndpointNodeMismatch(LineEnd::End));
            }
        }

        self.check_edge_crossing(start_node, end_node, &geom, None)?;

        let edge_id = self.store.get_next_edge_id()?;
        let containing_face = if containing_face == NULL_ID {
            UNIVERSE_FACE
        } else {
            containing_face
        };

        let mut edges = [Edge {
            edge_id,
            start_node,
            end_node,
            face_left: containing_face,
            face_right: containing_face,
            next_left: -edge_id,
            next_right: edge_id,
            geom,
        }];
        self.store.insert_edges(&mut edges)?;

        let unset = NodeUpdate {
            containing_face: Some(NULL_ID),
            ..Default::default()
        };
        self.store
            .update_nodes_by_id(&[(start_node, unset.clone()), (end_node, unset)])?;
        debug!(
            "added isolated edge {} between nodes {} and {}",
            edge_id, start_node, end_node
        );
        Ok(edge_id)
    }

    /// Remove an edge whose endpoints have no other incident edges; the
    /// endpoints become isolated in the edge's (single) bounding face.
    pub fn rem_iso_edge(&mut self, edge_id: ElemId) -> TopoResult<()> {
        let edge = self.load_edge(
            edge_id,
            columns::edge::START_NODE
                | columns::edge::END_NODE
                | columns::edge::FACE_LEFT
                | columns::edge::FACE_RIGHT,
        )?;

        if edge.face_left != edge.face_right {
            return Err(TopologyError::EdgeNotDangling);
        }
        let containing_face = edge.face_left;

        let incident = self
            .store
            .get_edge_by_node(&[edge.start_node, edge.end_node], columns::edge::EDGE_ID)?;
        if incident.iter().any(|e| e.edge_id != edge_id) {
            return Err(TopologyError::EdgeNotDangling);
        }

        self.store.check_remove_iso_edge(edge_id)?;

        let n = self.store.delete_edges(&crate::storage::EdgeSelect {
            edge_id: Some(edge_id),
            ..Default::default()
        })?;
        if n != 1 {
            return Err(TopologyError::CorruptedTopology(format!(
                "{} edges deleted when expecting 1",
                n
            )));
        }

        let back = NodeUpdate {
            containing_face: Some(containing_face),
            ..Default::default()
        };
        let mut updates = vec![(edge.start_node, back.clone())];
        if edge.end_node != edge.start_node {
            updates.push((edge.end_node, back));
        }
        self.store.update_nodes_by_id(&updates)?;
        Ok(())
    }
}
