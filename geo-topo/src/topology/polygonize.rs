//! Face recovery on a topology holding only edges.
//!
//! Walks the minimal ring on every unlabeled edge side: counterclockwise
//! rings become faces, clockwise rings are holes to be assigned to the
//! shell whose polygon contains them, found through an R-tree of shell
//! envelopes.

use geo::winding_order::{Winding, WindingOrder};
use geo_types::{Coord, LineString, Rect};
use log::debug;
use rstar::{RTree, RTreeObject, AABB};

use geo_topo_types::{columns, Edge, ElemId, Face, NULL_ID, UNIVERSE_FACE};

use crate::error::{TopoResult, TopologyError};
use crate::kernel::{self, RingPosition};
use crate::storage::{EdgeUpdate, Limit, TopoEvents, TopoStorage};

use super::Topology;

/// Side-face marker for hole rings awaiting shell assignment.
const HOLE_PLACEHOLDER: ElemId = ElemId::MIN;

#[derive(Debug, Clone, Copy)]
struct RingElem {
    idx: usize,
    left: bool,
}

#[derive(Debug)]
struct EdgeRing {
    elems: Vec<RingElem>,
    shell: LineString<f64>,
    bbox: Rect<f64>,
    /// Face registered for the ring; `HOLE_PLACEHOLDER` until a hole ring
    /// is assigned its containing shell.
    face: ElemId,
    /// Identifier of the edge the walk started from, to recognize a
    /// hole's own shell among candidates.
    first_edge: ElemId,
}

#[derive(Debug)]
struct ShellEntry {
    ring: usize,
    bbox: Rect<f64>,
}

impl RTreeObject for ShellEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min().x, self.bbox.min().y],
            [self.bbox.max().x, self.bbox.max().y],
        )
    }
}

fn rect_covers(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    outer.min().x <= inner.min().x
        && outer.min().y <= inner.min().y
        && outer.max().x >= inner.max().x
        && outer.max().y >= inner.max().y
}

fn side_face(edge: &Edge, left: bool) -> ElemId {
    if left {
        edge.face_left
    } else {
        edge.face_right
    }
}

fn set_side_face(edge: &mut Edge, left: bool, face: ElemId) {
    if left {
        edge.face_left = face;
    } else {
        edge.face_right = face;
    }
}

impl<S: TopoStorage + TopoEvents> Topology<S> {
    /// Recover the faces of a topology whose edges carry no face labels
    /// (as produced by the face-less loading path). The face table must
    /// be empty.
    pub fn polygonize(&mut self) -> TopoResult<()> {
        let existing =
            self.store
                .get_face_within_box(None, columns::face::FACE_ID, Limit::Existence)?;
        if !existing.is_empty() {
            return Err(TopologyError::CorruptedTopology(
                "polygonize requires an empty face table".into(),
            ));
        }

        let mut edges = self
            .store
            .get_edge_within_box(None, columns::edge::ALL, Limit::All)?;
        if edges.is_empty() {
            return Ok(());
        }
        edges.sort_by_key(|e| e.edge_id);
        for e in &mut edges {
            e.face_left = NULL_ID;
            e.face_right = NULL_ID;
        }

        let mut rings: Vec<EdgeRing> = Vec::new();
        let mut shells: Vec<usize> = Vec::new();
        let mut holes: Vec<usize> = Vec::new();

        let mut i = 0;
        while i < edges.len() {
            self.check_cancel()?;
            if edges[i].face_left != NULL_ID && edges[i].face_right != NULL_ID {
                i += 1;
                continue;
            }
            for left in [true, false] {
                if side_face(&edges[i], left) != NULL_ID {
                    continue;
                }
                let ring = self.build_edge_ring(&mut edges, i, left)?;
                let ring_index = rings.len();
                if ring.shell.winding_order() == Some(WindingOrder::CounterClockwise) {
                    let mut faces = [Face {
                        face_id: NULL_ID,
                        mbr: ring.bbox,
                    }];
                    self.store.insert_faces(&mut faces)?;
                    let face = faces[0].face_id;
                    debug!(
                        "ring of edge {} is a shell, face {}",
                        ring.first_edge, face
                    );
                    self.label_ring(&mut edges, &ring, face)?;
                    let mut ring = ring;
                    ring.face = face;
                    shells.push(ring_index);
                    rings.push(ring);
                } else {
                    debug!("ring of edge {} is a hole", ring.first_edge);
                    holes.push(ring_index);
                    rings.push(ring);
                }
            }
        }
        debug!("found {} shells and {} holes", shells.len(), holes.len());

        if holes.is_empty() {
            return Ok(());
        }

        let tree = RTree::bulk_load(
            shells
                .iter()
                .map(|&ring| ShellEntry {
                    ring,
                    bbox: rings[ring].bbox,
                })
                .collect(),
        );

        for &hole_index in &holes {
            self.check_cancel()?;
            let hole = &rings[hole_index];
            // Probe point: leading vertex of the starting edge's geometry.
            let probe = edges[hole.elems[0].idx].geom.0[0];

            let mut candidates: Vec<&ShellEntry> = tree
                .locate_in_envelope_intersecting(&AABB::from_point([probe.x, probe.y]))
                .collect();
            // The smallest containing shell wins; order candidates so the
            // scan is deterministic.
            candidates.sort_by(|a, b| {
                let area = |r: &Rect<f64>| r.width() * r.height();
                area(&a.bbox)
                    .partial_cmp(&area(&b.bbox))
                    .unwrap()
                    .then(rings[a.ring].face.cmp(&rings[b.ring].face))
            });

            let mut containing = UNIVERSE_FACE;
            for entry in candidates {
                let shell = &rings[entry.ring];
                if shell.first_edge == hole.first_edge {
                    // The other side of this very ring.
                    continue;
                }
                if entry.bbox == hole.bbox || !rect_covers(&entry.bbox, &hole.bbox) {
                    continue;
                }
                if kernel::point_in_ring(&shell.shell, probe) == RingPosition::Inside {
                    containing = shell.face;
                    break;
                }
            }
            debug!(
                "hole ring of edge {} assigned to face {}",
                hole.first_edge, containing
            );
            self.label_ring(&mut edges, &rings[hole_index], containing)?;
        }

        Ok(())
    }

    /// Walk the minimal ring from one side of an edge, marking the walked
    /// sides with the hole placeholder.
    fn build_edge_ring(
        &self,
        edges: &mut [Edge],
        start: usize,
        start_left: bool,
    ) -> TopoResult<EdgeRing> {
        let cap = edges.len() * 2 + 1;
        let mut elems = Vec::new();
        let mut pts: Vec<Coord<f64>> = Vec::new();
        let mut bbox: Option<Rect<f64>> = None;
        let mut cur = RingElem {
            idx: start,
            left: start_left,
        };
        loop {
            let edge = &mut edges[cur.idx];
            set_side_face(edge, cur.left, HOLE_PLACEHOLDER);
            elems.push(cur);

            let mut geom = edge.geom.0.clone();
            if !cur.left {
                geom.reverse();
            }
            let skip = usize::from(pts.last() == geom.first());
            pts.extend_from_slice(&geom[skip..]);
            let eb = super::edge_mbr(&edge.geom)?;
            bbox = Some(match bbox {
                None => eb,
                Some(b) => kernel::rect_union(&b, &eb),
            });

            let next = if cur.left {
                edge.next_left
            } else {
                edge.next_right
            };
            let idx = edges
                .binary_search_by_key(&next.abs(), |e| e.edge_id)
                .map_err(|_| {
                    TopologyError::CorruptedTopology(format!("non-existent ring edge {}", next))
                })?;
            cur = RingElem {
                idx,
                left: next > 0,
            };
            if cur.idx == start && cur.left == start_left {
                break;
            }
            if elems.len() >= cap {
                return Err(TopologyError::CorruptedTopology(format!(
                    "ring walk from edge {} exceeded {} steps",
                    edges[start].edge_id, cap
                )));
            }
        }

        let shell = LineString::from(pts);
        if shell.0.first() != shell.0.last() {
            return Err(TopologyError::CorruptedTopology(format!(
                "ring of edge {} is geometrically not-closed",
                edges[start].edge_id
            )));
        }
        Ok(EdgeRing {
            elems,
            shell,
            bbox: bbox.expect("ring has at least one edge"),
            face: HOLE_PLACEHOLDER,
            first_edge: edges[start].edge_id,
        })
    }

    /// Write `face` on the walked side of every ring edge, both locally
    /// and in storage.
    fn label_ring(&mut self, edges: &mut [Edge], ring: &EdgeRing, face: ElemId) -> TopoResult<()> {
        let mut updates: Vec<(ElemId, EdgeUpdate)> = Vec::new();
        for elem in &ring.elems {
            let edge = &mut edges[elem.idx];
            set_side_face(edge, elem.left, face);
            updates.push((
                edge.edge_id,
                if elem.left {
                    EdgeUpdate {
                        face_left: Some(face),
                        ..Default::default()
                    }
                } else {
                    EdgeUpdate {
                        face_right: Some(face),
                        ..Default::default()
                    }
                },
            ));
        }
        self.store.update_edges_by_id(&updates)?;
        Ok(())
    }
}
