//! Edge healing: remove a degree-2 node by merging its two incident edges.

use geo_types::LineString;
use log::debug;

use geo_topo_types::{columns, Edge, ElemId, NULL_ID};

use crate::error::{TopoResult, TopologyError};
use crate::storage::{EdgeSelect, EdgeUpdate, TopoEvents, TopoStorage};

use super::Topology;

/// Append `b` to `a`, collapsing the duplicated junction vertex.
fn concat_lines(a: &LineString<f64>, b: &LineString<f64>) -> LineString<f64> {
    let mut pts = a.0.clone();
    let skip = usize::from(b.0.first() == a.0.last());
    pts.extend_from_slice(&b.0[skip..]);
    LineString::from(pts)
}

fn reversed(line: &LineString<f64>) -> LineString<f64> {
    let mut pts = line.0.clone();
    pts.reverse();
    LineString::from(pts)
}

impl<S: TopoStorage + TopoEvents> Topology<S> {
    /// Heal two edges sharing a degree-2 node, keeping `e1`'s identifier.
    /// Returns the identifier of the removed node.
    pub fn mod_edge_heal(&mut self, e1: ElemId, e2: ElemId) -> TopoResult<ElemId> {
        self.heal_edges(e1, e2, true)
    }

    /// Heal two edges sharing a degree-2 node into a freshly numbered
    /// edge, removing both inputs. Returns the new edge identifier.
    pub fn new_edge_heal(&mut self, e1: ElemId, e2: ElemId) -> TopoResult<ElemId> {
        self.heal_edges(e1, e2, false)
    }

    /// Other edges incident to `node`, apart from the two being healed.
    /// A non-empty result resets the common node to "not found".
    fn other_node_edges(
        &self,
        node: ElemId,
        e1: ElemId,
        e2: ElemId,
        others: &mut Vec<ElemId>,
    ) -> TopoResult<bool> {
        let incident = self.store.get_edge_by_node(&[node], columns::edge::EDGE_ID)?;
        let mut clean = true;
        for e in incident {
            if e.edge_id != e1 && e.edge_id != e2 {
                others.push(e.edge_id);
                clean = false;
            }
        }
        Ok(clean)
    }

    fn heal_edges(&mut self, eid1: ElemId, eid2: ElemId, mod_edge: bool) -> TopoResult<ElemId> {
        if eid1 == eid2 {
            return Err(TopologyError::InvalidGeometry(
                "cannot heal an edge with itself",
            ));
        }

        let rows = self.store.get_edge_by_id(&[eid1, eid2], columns::edge::ALL)?;
        let e1 = rows
            .iter()
            .find(|e| e.edge_id == eid1)
            .ok_or(TopologyError::NonExistentEdge(eid1))?
            .clone();
        let e2 = rows
            .iter()
            .find(|e| e.edge_id == eid2)
            .ok_or(TopologyError::NonExistentEdge(eid2))?
            .clone();

        if e1.is_closed() || e2.is_closed() {
            return Err(TopologyError::InvalidGeometry(
                "closed edges cannot be healed",
            ));
        }

        // The four junction cases, by which endpoints coincide. The heal
        // only applies when no other edge shares the junction node.
        let mut others = Vec::new();
        let mut common = NULL_ID;
        let mut caseno = 0;
        if e1.end_node == e2.start_node {
            common = e1.end_node;
            caseno = 1;
        } else if e1.end_node == e2.end_node {
            common = e1.end_node;
            caseno = 2;
        }
        if common != NULL_ID && !self.other_node_edges(common, eid1, eid2, &mut others)? {
            common = NULL_ID;
        }
        if common == NULL_ID {
            if e1.start_node == e2.start_node {
                common = e1.start_node;
                caseno = 3;
            } else if e1.start_node == e2.end_node {
                common = e1.start_node;
                caseno = 4;
            }
            if common != NULL_ID && !self.other_node_edges(common, eid1, eid2, &mut others)? {
                common = NULL_ID;
            }
        }
        if common == NULL_ID {
            return Err(TopologyError::HealDegreeMismatch(others));
        }

        self.store.check_remove_node(common, eid1, eid2)?;

        // Merged geometry and linking; e*_free is the sign with which
        // stale references to each edge's free endpoint appear, e2_sign
        // whether e2 keeps its direction in the merged line.
        let (geom, start_node, end_node, next_left, next_right, e1_free, e2_free, e2_sign): (
            LineString<f64>,
            ElemId,
            ElemId,
            ElemId,
            ElemId,
            i64,
            i64,
            i64,
        ) = match caseno {
            1 => (
                concat_lines(&e1.geom, &e2.geom),
                e1.start_node,
                e2.end_node,
                e2.next_left,
                e1.next_right,
                1,
                -1,
                1,
            ),
            2 => (
                concat_lines(&e1.geom, &reversed(&e2.geom)),
                e1.start_node,
                e2.start_node,
                e2.next_right,
                e1.next_right,
                1,
                1,
                -1,
            ),
            3 => (
                concat_lines(&reversed(&e2.geom), &e1.geom),
                e2.end_node,
                e1.end_node,
                e1.next_left,
                e2.next_left,
                -1,
                -1,
                -1,
            ),
            4 => (
                concat_lines(&e2.geom, &e1.geom),
                e2.start_node,
                e1.end_node,
                e1.next_left,
                e2.next_right,
                -1,
                1,
                1,
            ),
            _ => unreachable!("junction case fell through with a common node"),
        };

        let new_id = if mod_edge {
            let n = self.store.update_edges_by_id(&[(
                eid1,
                EdgeUpdate {
                    start_node: Some(start_node),
                    end_node: Some(end_node),
                    next_left: Some(next_left),
                    next_right: Some(next_right),
                    geom: Some(geom),
                    ..Default::default()
                },
            )])?;
            if n != 1 {
                return Err(TopologyError::CorruptedTopology(format!(
                    "{} edges updated when expecting 1",
                    n
                )));
            }
            eid1
        } else {
            let mut new_edges = [Edge {
                edge_id: NULL_ID,
                start_node,
                end_node,
                face_left: e1.face_left,
                face_right: e1.face_right,
                next_left,
                next_right,
                geom,
            }];
            self.store.insert_edges(&mut new_edges)?;
            new_edges[0].edge_id
        };

        // References to the free end of e2 now continue on the merged
        // edge, with e2's orientation folded in.
        self.store.update_edges(
            &EdgeSelect {
                next_left: Some(e2_free * eid2),
                ..Default::default()
            },
            &EdgeUpdate {
                next_left: Some(e2_free * new_id * e2_sign),
                ..Default::default()
            },
            None,
        )?;
        self.store.update_edges(
            &EdgeSelect {
                next_right: Some(e2_free * eid2),
                ..Default::default()
            },
            &EdgeUpdate {
                next_right: Some(e2_free * new_id * e2_sign),
                ..Default::default()
            },
            None,
        )?;

        if !mod_edge {
            self.store.update_edges(
                &EdgeSelect {
                    next_left: Some(e1_free * eid1),
                    ..Default::default()
                },
                &EdgeUpdate {
                    next_left: Some(e1_free * new_id),
                    ..Default::default()
                },
                None,
            )?;
            self.store.update_edges(
                &EdgeSelect {
                    next_right: Some(e1_free * eid1),
                    ..Default::default()
                },
                &EdgeUpdate {
                    next_right: Some(e1_free * new_id),
                    ..Default::default()
                },
                None,
            )?;
        }

        self.store.delete_edges(&EdgeSelect {
            edge_id: Some(eid2),
            ..Default::default()
        })?;
        if !mod_edge {
            self.store.delete_edges(&EdgeSelect {
                edge_id: Some(eid1),
                ..Default::default()
            })?;
        }

        self.store.delete_nodes_by_id(&[common])?;

        self.store.on_edge_heal(eid1, eid2, new_id)?;
        debug!(
            "healed edges {} and {} into {} (case {}), node {} removed",
            eid1, eid2, new_id, caseno, common
        );

        Ok(if mod_edge { common } else { new_id })
    }
}
