//! Ring assembly and face splitting.
//!
//! When a new edge closes a cycle, the ring walked on one of its sides
//! either bounds a brand new face (counterclockwise ring), carves a hole
//! out of a finite face (clockwise ring), or faces the universe.

use geo::winding_order::{Winding, WindingOrder};
use geo_types::LineString;
use log::debug;

use geo_topo_types::{columns, ElemId, Face, UNIVERSE_FACE};

use crate::error::{TopoResult, TopologyError};
use crate::kernel::{self, RingPosition};
use crate::storage::{EdgeUpdate, NodeUpdate, TopoEvents, TopoStorage};

use super::{edge_mbr, Topology};

/// What walking one side of an edge produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FaceSplitOutcome {
    /// The walk got back through the other side of the starting edge: the
    /// edge is a bridge or dangling, no ring exists on this side.
    NotARing,
    /// The ring exists but no face was created on this side (it faces the
    /// universe, or only an MBR refresh was requested).
    Universe,
    Created(ElemId),
}

impl<S: TopoStorage + TopoEvents> Topology<S> {
    /// Assemble the closed shell of a walked ring, reversing the geometry
    /// of edges traversed backwards. The result is used for winding and
    /// containment tests only, never stored.
    pub(crate) fn ring_shell(&self, signed_edge_ids: &[ElemId]) -> TopoResult<LineString<f64>> {
        let mut unique: Vec<ElemId> = Vec::new();
        for &sid in signed_edge_ids {
            if !unique.contains(&sid.abs()) {
                unique.push(sid.abs());
            }
        }
        let rows = self
            .store
            .get_edge_by_id(&unique, columns::edge::EDGE_ID | columns::edge::GEOM)?;
        if rows.len() != unique.len() {
            return Err(TopologyError::CorruptedTopology(format!(
                "{} edges found when expecting {}",
                rows.len(),
                unique.len()
            )));
        }

        let mut shell: Vec<geo_types::Coord<f64>> = Vec::new();
        for &sid in signed_edge_ids {
            let edge = rows
                .iter()
                .find(|e| e.edge_id == sid.abs())
                .ok_or_else(|| {
                    TopologyError::CorruptedTopology(format!("missing ring edge {}", sid))
                })?;
            let mut pts = edge.geom.0.clone();
            if sid < 0 {
                pts.reverse();
            }
            let skip = usize::from(shell.last() == pts.first());
            shell.extend_from_slice(&pts[skip..]);
        }
        Ok(LineString::from(shell))
    }

    /// Walk the ring on one side of `sedge` and create (or shrink) the
    /// face accordingly. `face` is the face known to contain the edge;
    /// with `mbr_only` no face is created, the ring MBR is only folded
    /// into `face`'s row.
    pub(crate) fn add_face_split(
        &mut self,
        sedge: ElemId,
        face: ElemId,
        mbr_only: bool,
    ) -> TopoResult<FaceSplitOutcome> {
        let signed_edge_ids = self.store.get_ring_edges(sedge, None)?;
        debug!(
            "ring of edge {} has {} signed edges",
            sedge,
            signed_edge_ids.len()
        );

        // Meeting the other side of the starting edge means the walk
        // doubled back: a bridge, not a ring.
        if signed_edge_ids.contains(&-sedge) {
            return Ok(FaceSplitOutcome::NotARing);
        }

        let shell = self.ring_shell(&signed_edge_ids)?;
        if shell.0.first() != shell.0.last() {
            return Err(TopologyError::CorruptedTopology(format!(
                "ring of edge {} is geometrically not-closed",
                sedge
            )));
        }
        let is_ccw = shell.winding_order() == Some(WindingOrder::CounterClockwise);
        let shellbox = edge_mbr(&shell)?;
        debug!(
            "ring of edge {} in face {} is {}",
            sedge,
            face,
            if is_ccw { "ccw" } else { "cw" }
        );

        if face == UNIVERSE_FACE && !is_ccw {
            // The clockwise ring encloses everything but this face: its
            // side is the universe, nothing to create.
            return Ok(FaceSplitOutcome::Universe);
        }

        if mbr_only && face != UNIVERSE_FACE {
            if is_ccw {
                self.store.update_faces_by_id(&[Face {
                    face_id: face,
                    mbr: shellbox,
                }])?;
            }
            return Ok(FaceSplitOutcome::Universe);
        }

        // A clockwise ring in a finite face punches a hole: the new face
        // takes over the outside of the ring and inherits the old MBR.
        let newface_outside = face != UNIVERSE_FACE && !is_ccw;
        let mbr = if newface_outside {
            let rows = self.store.get_face_by_id(&[face], columns::face::ALL)?;
            match rows.len() {
                1 => rows[0].mbr,
                n => {
                    return Err(TopologyError::CorruptedTopology(format!(
                        "{} faces found when expecting 1 (face {})",
                        n, face
                    )))
                }
            }
        } else {
            shellbox
        };

        let mut faces = [Face {
            face_id: geo_topo_types::NULL_ID,
            mbr,
        }];
        self.store.insert_faces(&mut faces)?;
        let new_face = faces[0].face_id;
        debug!(
            "face {} split by ring of edge {}: new face {} on the {}",
            face,
            sedge,
            new_face,
            if newface_outside { "outside" } else { "inside" }
        );

        // Rebind the sides of the old face's edges that now look at the
        // new face.
        let fields = columns::edge::EDGE_ID
            | columns::edge::FACE_LEFT
            | columns::edge::FACE_RIGHT
            | columns::edge::GEOM;
        let face_edges = self.store.get_edge_by_face(&[face], fields, Some(&mbr))?;
        let mut edge_updates: Vec<(ElemId, EdgeUpdate)> = Vec::new();
        for e in &face_edges {
            let mut on_ring = false;
            for &sid in &signed_edge_ids {
                if sid == e.edge_id {
                    edge_updates.push((
                        e.edge_id,
                        EdgeUpdate {
                            face_left: Some(new_face),
                            ..Default::default()
                        },
                    ));
                    on_ring = true;
                } else if -sid == e.edge_id {
                    edge_updates.push((
                        e.edge_id,
                        EdgeUpdate {
                            face_right: Some(new_face),
                            ..Default::default()
                        },
                    ));
                    on_ring = true;
                }
            }
            if on_ring {
                continue;
            }

            let ep = kernel::interior_line_point(&e.geom).ok_or_else(|| {
                TopologyError::CorruptedTopology(format!("edge {} is collapsed", e.edge_id))
            })?;
            let contains = if kernel::rect_contains(&shellbox, ep) {
                kernel::point_in_ring(&shell, ep)
            } else {
                RingPosition::Outside
            };
            let wanted = if newface_outside {
                RingPosition::Outside
            } else {
                RingPosition::Inside
            };
            if contains != wanted {
                continue;
            }
            if e.face_left == face {
                edge_updates.push((
                    e.edge_id,
                    EdgeUpdate {
                        face_left: Some(new_face),
                        ..Default::default()
                    },
                ));
            }
            if e.face_right == face {
                edge_updates.push((
                    e.edge_id,
                    EdgeUpdate {
                        face_right: Some(new_face),
                        ..Default::default()
                    },
                ));
            }
        }
        if !edge_updates.is_empty() {
            self.store.update_edges_by_id(&edge_updates)?;
        }

        // Isolated nodes that moved with the split.
        let nodes = self.store.get_node_by_face(
            &[face],
            columns::node::NODE_ID | columns::node::GEOM,
            Some(&mbr),
        )?;
        let mut node_updates: Vec<(ElemId, NodeUpdate)> = Vec::new();
        for n in &nodes {
            let contained = kernel::point_in_ring(&shell, n.geom.0) == RingPosition::Inside;
            if newface_outside == contained {
                continue;
            }
            node_updates.push((
                n.node_id,
                NodeUpdate {
                    containing_face: Some(new_face),
                    ..Default::default()
                },
            ));
        }
        if !node_updates.is_empty() {
            self.store.update_nodes_by_id(&node_updates)?;
        }

        Ok(FaceSplitOutcome::Created(new_face))
    }
}
