//! Edge removal, merging the faces on its two sides when they differ.

use log::debug;

use geo_topo_types::{columns, ElemId, Face, NULL_ID, UNIVERSE_FACE};

use crate::error::{TopoResult, TopologyError};
use crate::kernel;
use crate::storage::{
    EdgeSelect, EdgeUpdate, NodeSelect, NodeUpdate, TopoEvents, TopoStorage,
};

use super::Topology;

impl<S: TopoStorage + TopoEvents> Topology<S> {
    /// Remove an edge. When its sides bound different faces the face on
    /// the right side survives and floods the other. Returns the face that
    /// takes up the space previously bound by the edge.
    pub fn rem_edge_mod_face(&mut self, edge_id: ElemId) -> TopoResult<ElemId> {
        self.rem_edge(edge_id, true)
    }

    /// Remove an edge. When its sides bound different faces both are
    /// replaced by one freshly numbered face. Returns the new face id, or
    /// the universe/common face id when no new face was needed.
    pub fn rem_edge_new_face(&mut self, edge_id: ElemId) -> TopoResult<ElemId> {
        self.rem_edge(edge_id, false)
    }

    /// Rewrite face references after a heal: every edge and isolated node
    /// still pointing at `old` now points at `new`.
    fn update_face_refs(&mut self, old: ElemId, new: ElemId) -> TopoResult<()> {
        debug_assert_ne!(old, UNIVERSE_FACE);
        self.store.update_edges(
            &EdgeSelect {
                face_left: Some(old),
                ..Default::default()
            },
            &EdgeUpdate {
                face_left: Some(new),
                ..Default::default()
            },
            None,
        )?;
        self.store.update_edges(
            &EdgeSelect {
                face_right: Some(old),
                ..Default::default()
            },
            &EdgeUpdate {
                face_right: Some(new),
                ..Default::default()
            },
            None,
        )?;
        self.store.update_nodes(
            &NodeSelect {
                containing_face: Some(old),
                ..Default::default()
            },
            &NodeUpdate {
                containing_face: Some(new),
                ..Default::default()
            },
            None,
        )?;
        Ok(())
    }

    fn rem_edge(&mut self, edge_id: ElemId, mod_face: bool) -> TopoResult<ElemId> {
        let edge = self.load_edge(edge_id, columns::edge::ALL)?;

        self.store
            .check_remove_edge(edge_id, edge.face_left, edge.face_right)?;

        // Unlink: every edge whose next_* enters the removed edge skips
        // over it to whatever the removed edge pointed at on that side.
        let node_ids: Vec<ElemId> = if edge.start_node != edge.end_node {
            vec![edge.start_node, edge.end_node]
        } else {
            vec![edge.start_node]
        };
        let fields = columns::edge::EDGE_ID
            | columns::edge::START_NODE
            | columns::edge::END_NODE
            | columns::edge::NEXT_LEFT
            | columns::edge::NEXT_RIGHT;
        let incident = self.store.get_edge_by_node(&node_ids, fields)?;

        let mut start_degree = 0usize;
        let mut end_degree = 0usize;
        let mut left_updates: Vec<(ElemId, EdgeUpdate)> = Vec::new();
        let mut right_updates: Vec<(ElemId, EdgeUpdate)> = Vec::new();
        for e in &incident {
            if e.edge_id == edge_id {
                continue;
            }
            if e.start_node == edge.start_node || e.end_node == edge.start_node {
                start_degree += 1;
            }
            if e.start_node == edge.end_node || e.end_node == edge.end_node {
                end_degree += 1;
            }

            if e.next_left == -edge_id {
                left_updates.push((
                    e.edge_id,
                    EdgeUpdate {
                        next_left: Some(if edge.next_left != edge_id {
                            edge.next_left
                        } else {
                            edge.next_right
                        }),
                        ..Default::default()
                    },
                ));
            } else if e.next_left == edge_id {
                left_updates.push((
                    e.edge_id,
                    EdgeUpdate {
                        next_left: Some(if edge.next_right != -edge_id {
                            edge.next_right
                        } else {
                            edge.next_left
                        }),
                        ..Default::default()
                    },
                ));
            }

            if e.next_right == -edge_id {
                right_updates.push((
                    e.edge_id,
                    EdgeUpdate {
                        next_right: Some(if edge.next_left != edge_id {
                            edge.next_left
                        } else {
                            edge.next_right
                        }),
                        ..Default::default()
                    },
                ));
            } else if e.next_right == edge_id {
                right_updates.push((
                    e.edge_id,
                    EdgeUpdate {
                        next_right: Some(if edge.next_right != -edge_id {
                            edge.next_right
                        } else {
                            edge.next_left
                        }),
                        ..Default::default()
                    },
                ));
            }
        }
        if !left_updates.is_empty() {
            self.store.update_edges_by_id(&left_updates)?;
        }
        if !right_updates.is_empty() {
            self.store.update_edges_by_id(&right_updates)?;
        }

        // The face taking up the space previously split by the edge.
        let floodface;
        let mut new_face_id = UNIVERSE_FACE;
        if edge.face_left == edge.face_right {
            floodface = edge.face_right;
        } else {
            if edge.face_left == UNIVERSE_FACE || edge.face_right == UNIVERSE_FACE {
                floodface = UNIVERSE_FACE;
            } else {
                // The right face survives a modifying heal, to mirror the
                // face kept by a modifying split.
                let faces = self
                    .store
                    .get_face_by_id(&[edge.face_left, edge.face_right], columns::face::ALL)?;
                let left = faces
                    .iter()
                    .find(|f| f.face_id == edge.face_left)
                    .ok_or_else(|| {
                        TopologyError::CorruptedTopology(format!(
                            "no face has face_id={} (left face for edge {})",
                            edge.face_left, edge_id
                        ))
                    })?;
                let right = faces
                    .iter()
                    .find(|f| f.face_id == edge.face_right)
                    .ok_or_else(|| {
                        TopologyError::CorruptedTopology(format!(
                            "no face has face_id={} (right face for edge {})",
                            edge.face_right, edge_id
                        ))
                    })?;
                let mbr = kernel::rect_union(&left.mbr, &right.mbr);
                if mod_face {
                    floodface = edge.face_right;
                    self.store.update_faces_by_id(&[Face {
                        face_id: floodface,
                        mbr,
                    }])?;
                } else {
                    let mut faces = [Face {
                        face_id: NULL_ID,
                        mbr,
                    }];
                    self.store.insert_faces(&mut faces)?;
                    floodface = faces[0].face_id;
                    new_face_id = floodface;
                }
            }

            if edge.face_left != floodface {
                self.update_face_refs(edge.face_left, floodface)?;
            }
            if edge.face_right != floodface {
                self.update_face_refs(edge.face_right, floodface)?;
            }

            self.store
                .on_face_heal(edge.face_right, edge.face_left, floodface)?;
        }

        self.store.delete_edges(&EdgeSelect {
            edge_id: Some(edge_id),
            ..Default::default()
        })?;

        // Endpoints left with no incident edge become isolated in the
        // flood face.
        let mut node_updates: Vec<(ElemId, NodeUpdate)> = Vec::new();
        let isolate = NodeUpdate {
            containing_face: Some(floodface),
            ..Default::default()
        };
        if start_degree == 0 {
            node_updates.push((edge.start_node, isolate.clone()));
        }
        if edge.end_node != edge.start_node && end_degree == 0 {
            node_updates.push((edge.end_node, isolate));
        }
        if !node_updates.is_empty() {
            self.store.update_nodes_by_id(&node_updates)?;
        }

        if edge.face_left != edge.face_right {
            let mut doomed = Vec::new();
            if edge.face_right != floodface {
                doomed.push(edge.face_right);
            }
            if edge.face_left != floodface {
                doomed.push(edge.face_left);
            }
            self.store.delete_faces_by_id(&doomed)?;
        }

        debug!(
            "removed edge {}, flood face {} ({} edges relinked)",
            edge_id,
            floodface,
            left_updates.len() + right_updates.len()
        );
        Ok(if mod_face { floodface } else { new_face_id })
    }
}
