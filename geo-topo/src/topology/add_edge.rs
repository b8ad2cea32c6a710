//! Adding a non-isolated edge, with face splitting.

use geo_types::LineString;
use log::debug;

use geo_topo_types::{columns, Edge, ElemId, NULL_ID, UNIVERSE_FACE};

use crate::error::{LineEnd, TopoResult, TopologyError};
use crate::kernel;
use crate::storage::{EdgeSelect, EdgeUpdate, NodeSelect, NodeUpdate, TopoEvents, TopoStorage};

use super::face_split::FaceSplitOutcome;
use super::{edge_spans_from_line, Topology};

/// How an edge addition treats the faces around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceHandling {
    /// Do not consult or maintain faces at all: the new edge gets
    /// `face_left = face_right = -1`. This is the loading backdoor used
    /// before a later [`Topology::polygonize`] pass.
    NoFaceCheck,
    /// A face split keeps the split face and adds one new face.
    ModFace,
    /// A face split replaces the split face with two new faces.
    NewFaces,
}

impl<S: TopoStorage + TopoEvents> Topology<S> {
    /// Add an edge between two existing nodes, modifying the split face in
    /// place if the new edge closes a ring. Returns the new edge id.
    pub fn add_edge_mod_face(
        &mut self,
        start_node: ElemId,
        end_node: ElemId,
        geom: LineString<f64>,
        skip_checks: bool,
    ) -> TopoResult<ElemId> {
        self.add_edge(start_node, end_node, geom, skip_checks, FaceHandling::ModFace)
    }

    /// Add an edge between two existing nodes, replacing a split face with
    /// two new faces. Returns the new edge id.
    pub fn add_edge_new_faces(
        &mut self,
        start_node: ElemId,
        end_node: ElemId,
        geom: LineString<f64>,
        skip_checks: bool,
    ) -> TopoResult<ElemId> {
        self.add_edge(start_node, end_node, geom, skip_checks, FaceHandling::NewFaces)
    }

    pub(crate) fn add_edge(
        &mut self,
        start_node: ElemId,
        end_node: ElemId,
        geom: LineString<f64>,
        skip_checks: bool,
        mode: FaceHandling,
    ) -> TopoResult<ElemId> {
        let face_aware = mode != FaceHandling::NoFaceCheck;

        if !skip_checks && !kernel::is_simple_line(&geom) {
            return Err(TopologyError::InvalidGeometry("curve not simple"));
        }

        let clean = kernel::remove_repeated_points(&geom, 0.0);
        let (mut span, mut epan) = edge_spans_from_line(&clean)?;

        let mut face_left = NULL_ID;
        let mut face_right = NULL_ID;

        // Endpoint rows: isolated endpoints seed the edge's face.
        let node_ids: Vec<ElemId> = if start_node != end_node {
            vec![start_node, end_node]
        } else {
            vec![start_node]
        };
        let endpoints = self.store.get_node_by_id(&node_ids, columns::node::ALL)?;
        let mut start_geom = None;
        let mut end_geom = None;
        for node in &endpoints {
            if face_aware && node.containing_face != NULL_ID {
                if face_left == NULL_ID {
                    face_left = node.containing_face;
                    face_right = node.containing_face;
                } else if face_left != node.containing_face {
                    return Err(TopologyError::SideLocationConflict(
                        face_left,
                        node.containing_face,
                    ));
                }
            }
            if node.node_id == start_node {
                start_geom = Some(node.geom);
            }
            if node.node_id == end_node {
                end_geom = Some(node.geom);
            }
        }

        if !skip_checks {
            let sp = start_geom.ok_or(TopologyError::NonExistentNode(start_node))?;
            if sp.0 != clean.0[0] {
                return Err(TopologyError::EndpointNodeMismatch(LineEnd::Start));
            }
            let ep = end_geom.ok_or(TopologyError::NonExistentNode(end_node))?;
            if ep.0 != clean.0[clean.0.len() - 1] {
                return Err(TopologyError::EndpointNodeMismatch(LineEnd::End));
            }
            self.check_edge_crossing(start_node, end_node, &geom, None)?;
        }

        let edge_id = self.store.get_next_edge_id()?;
        let is_closed = start_node == end_node;

        // Fan analysis at the start node.
        let other = epan;
        let found =
            self.find_adjacent_edges(start_node, &mut span, is_closed.then_some(&other), None)?;
        let prev_left;
        let next_right;
        if found > 0 {
            span.was_isolated = false;
            next_right = if span.next_cw != 0 {
                span.next_cw
            } else {
                -edge_id
            };
            prev_left = if span.next_ccw != 0 {
                -span.next_ccw
            } else {
                edge_id
            };
            if face_aware {
                if face_right == NULL_ID {
                    face_right = span.cw_face;
                }
                if face_left == NULL_ID {
                    face_left = span.ccw_face;
                }
            }
        } else {
            span.was_isolated = true;
            next_right = if is_closed { -edge_id } else { edge_id };
            prev_left = if is_closed { edge_id } else { -edge_id };
        }

        // Fan analysis at the end node. For a closed edge the faces left
        // unresolved on one flank are covered by the other end's flanks.
        let other = span;
        let found =
            self.find_adjacent_edges(end_node, &mut epan, is_closed.then_some(&other), None)?;
        let prev_right;
        let next_left;
        if found > 0 {
            epan.was_isolated = false;
            next_left = if epan.next_cw != 0 { epan.next_cw } else { edge_id };
            prev_right = if epan.next_ccw != 0 {
                -epan.next_ccw
            } else {
                -edge_id
            };
            if face_aware {
                if face_right == NULL_ID {
                    face_right = span.ccw_face;
                } else if face_right != epan.ccw_face {
                    return Err(TopologyError::SideLocationConflict(
                        face_right,
                        epan.ccw_face,
                    ));
                }
                if face_left == NULL_ID {
                    face_left = span.cw_face;
                } else if face_left != epan.cw_face {
                    return Err(TopologyError::SideLocationConflict(face_left, epan.cw_face));
                }
            }
        } else {
            epan.was_isolated = true;
            next_left = if is_closed { edge_id } else { -edge_id };
            prev_right = if is_closed { -edge_id } else { edge_id };
        }

        if face_aware {
            if face_left != face_right {
                return Err(TopologyError::CorruptedTopology(format!(
                    "left ({}) and right ({}) faces of new edge mismatch",
                    face_left, face_right
                )));
            }
            if face_left == NULL_ID {
                return Err(TopologyError::CorruptedTopology(
                    "could not derive edge face from linked primitives".into(),
                ));
            }
        }

        let mut new_edges = [Edge {
            edge_id,
            start_node,
            end_node,
            face_left,
            face_right,
            next_left,
            next_right,
            geom,
        }];
        self.store.insert_edges(&mut new_edges)?;

        // Stitch the two pre-existing links onto the new edge.
        for (prev, to_us) in [(prev_left, edge_id), (prev_right, -edge_id)] {
            if prev.abs() == edge_id {
                continue;
            }
            let (sel, upd) = if prev > 0 {
                (
                    EdgeSelect {
                        edge_id: Some(prev),
                        ..Default::default()
                    },
                    EdgeUpdate {
                        next_left: Some(to_us),
                        ..Default::default()
                    },
                )
            } else {
                (
                    EdgeSelect {
                        edge_id: Some(-prev),
                        ..Default::default()
                    },
                    EdgeUpdate {
                        next_right: Some(to_us),
                        ..Default::default()
                    },
                )
            };
            self.store.update_edges(&sel, &upd, None)?;
        }

        // Endpoints that were isolated are not anymore.
        for (was, node) in [(span.was_isolated, start_node), (epan.was_isolated, end_node)] {
            if was {
                self.store.update_nodes(
                    &NodeSelect {
                        node_id: Some(node),
                        ..Default::default()
                    },
                    &NodeUpdate {
                        containing_face: Some(NULL_ID),
                        ..Default::default()
                    },
                    None,
                )?;
            }
        }

        if !face_aware {
            return Ok(edge_id);
        }

        if !is_closed && (span.was_isolated || epan.was_isolated) {
            debug!("new edge {} is dangling, no face split possible", edge_id);
            return Ok(edge_id);
        }

        let mut second_face = None;
        if mode == FaceHandling::NewFaces {
            match self.add_face_split(-edge_id, face_left, false)? {
                FaceSplitOutcome::NotARing => return Ok(edge_id),
                FaceSplitOutcome::Universe => {}
                FaceSplitOutcome::Created(f) => second_face = Some(f),
            }
        }

        let first_face = if mode == FaceHandling::ModFace {
            match self.add_face_split(edge_id, face_left, false)? {
                FaceSplitOutcome::NotARing => return Ok(edge_id),
                FaceSplitOutcome::Universe => {
                    // Left side is the universe: the finite face, if any,
                    // forms on the right.
                    match self.add_face_split(-edge_id, face_left, false)? {
                        FaceSplitOutcome::Created(f) => Some(f),
                        _ => return Ok(edge_id),
                    }
                }
                FaceSplitOutcome::Created(f) => {
                    // Refresh the kept face's MBR from the other ring.
                    self.add_face_split(-edge_id, face_left, true)?;
                    Some(f)
                }
            }
        } else {
            match self.add_face_split(edge_id, face_left, false)? {
                FaceSplitOutcome::Created(f) => Some(f),
                _ => None,
            }
        };

        if face_left != UNIVERSE_FACE {
            let first_face = first_face.ok_or_else(|| {
                TopologyError::CorruptedTopology(
                    "face split produced no face on the left of the new edge".into(),
                )
            })?;
            self.store.on_face_split(face_left, first_face, second_face)?;
            if mode == FaceHandling::NewFaces {
                self.store.delete_faces_by_id(&[face_left])?;
            }
        }

        Ok(edge_id)
    }
}
