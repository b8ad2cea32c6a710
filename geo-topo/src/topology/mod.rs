//! The topology engine: primitive operators, population operators, queries
//! and the polygonizer, all expressed against an abstract storage backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use geo::BoundingRect;
use geo_types::{LineString, Rect};
use log::debug;

use geo_topo_types::{columns, Edge, ElemId, Node, NULL_ID};

use crate::error::{TopoResult, TopologyError};
use crate::kernel;
use crate::storage::{TopoEvents, TopoStorage};

mod add_edge;
mod change_geom;
mod crossing;
mod face_split;
mod heal;
mod iso;
mod polygonize;
mod populate;
mod query;
mod rem_edge;
mod split;

pub use add_edge::FaceHandling;

/// A cloneable cancellation flag.
///
/// The heavy loops of the engine ([`Topology::add_line`] candidate scans,
/// [`Topology::polygonize`]) poll the flag and bail out with
/// [`TopologyError::Cancelled`] before performing further writes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A planar topology over a storage backend.
///
/// All mutating operations preserve the topological invariants of the
/// model: edge geometries begin and end on their nodes, rings stay closed,
/// `next_left`/`next_right` cycles partition face boundaries, isolated
/// nodes know their containing face, and face MBRs cover their boundary.
#[derive(Debug)]
pub struct Topology<S: TopoStorage + TopoEvents> {
    store: S,
    precision: f64,
    cancel: CancelToken,
}

impl<S: TopoStorage + TopoEvents> Topology<S> {
    /// Wrap a storage backend with zero default precision: population
    /// operators called with `tol = 0` will derive a tolerance from the
    /// input ordinates.
    pub fn new(store: S) -> Self {
        Self::with_precision(store, 0.0)
    }

    /// Wrap a storage backend with a fixed default snapping precision.
    pub fn with_precision(store: S, precision: f64) -> Self {
        Topology {
            store,
            precision,
            cancel: CancelToken::default(),
        }
    }

    pub fn precision(&self) -> f64 {
        self.precision
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub(crate) fn check_cancel(&self) -> TopoResult<()> {
        if self.cancel.is_cancelled() {
            return Err(TopologyError::Cancelled);
        }
        Ok(())
    }

    /// Working tolerance: the explicit one if non-zero, else the topology
    /// precision, else the smallest delta perturbing the given bounds.
    pub(crate) fn tolerance_for(&self, tol: f64, bounds: Option<&Rect<f64>>) -> f64 {
        if tol != 0.0 {
            tol
        } else if self.precision != 0.0 {
            self.precision
        } else {
            kernel::min_tolerance(bounds)
        }
    }

    pub(crate) fn load_edge(&self, edge_id: ElemId, fields: u32) -> TopoResult<Edge> {
        let mut rows = self.store.get_edge_by_id(&[edge_id], fields)?;
        match rows.len() {
            0 => Err(TopologyError::NonExistentEdge(edge_id)),
            1 => Ok(rows.pop().unwrap()),
            _ => Err(TopologyError::CorruptedTopology(format!(
                "more than a single edge has id {}",
                edge_id
            ))),
        }
    }

    pub(crate) fn load_node(&self, node_id: ElemId, fields: u32) -> TopoResult<Node> {
        let mut rows = self.store.get_node_by_id(&[node_id], fields)?;
        match rows.len() {
            0 => Err(TopologyError::NonExistentNode(node_id)),
            1 => Ok(rows.pop().unwrap()),
            _ => Err(TopologyError::CorruptedTopology(format!(
                "more than a single node has id {}",
                node_id
            ))),
        }
    }

    /// Recompute and store the MBR of every non-universe face among the
    /// arguments, after an edge geometry change.
    pub(crate) fn refresh_face_mbrs(&mut self, faces: &[ElemId]) -> TopoResult<()> {
        let mut seen = Vec::new();
        let mut rows = Vec::new();
        for &f in faces {
            if f <= 0 || seen.contains(&f) {
                continue;
            }
            seen.push(f);
            let mbr = self.store.compute_face_mbr(f)?;
            rows.push(geo_topo_types::Face { face_id: f, mbr });
        }
        if !rows.is_empty() {
            self.store.update_faces_by_id(&rows)?;
        }
        Ok(())
    }
}

/// Analysis of one edge end attached to a node: the azimuth it leaves the
/// node with, and the fan neighborhood found around that azimuth.
///
/// `next_cw`/`next_ccw` are signed edge identifiers (positive when the
/// neighbor edge leaves the node, negative when it arrives); zero means no
/// neighbor was found. `cw_face` is the face between this azimuth and the
/// next clockwise edge end, `ccw_face` the one on the other flank.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EdgeSpan {
    pub my_az: f64,
    pub next_cw: ElemId,
    pub next_ccw: ElemId,
    pub cw_face: ElemId,
    pub ccw_face: ElemId,
    pub was_isolated: bool,
}

impl EdgeSpan {
    fn new(my_az: f64) -> Self {
        EdgeSpan {
            my_az,
            next_cw: 0,
            next_ccw: 0,
            cw_face: NULL_ID,
            ccw_face: NULL_ID,
            was_isolated: false,
        }
    }
}

/// Fold one edge end into the angular window kept by
/// [`Topology::find_adjacent_edges`]: the end with the smallest positive
/// azimuth difference is the next clockwise, the one with the largest the
/// next counterclockwise.
fn consider_edge_end(
    span: &mut EdgeSpan,
    minmax: &mut Option<(f64, f64)>,
    azdif: f64,
    signed_id: ElemId,
    cw_face: ElemId,
    ccw_face: ElemId,
) {
    match *minmax {
        None => {
            *minmax = Some((azdif, azdif));
            span.next_cw = signed_id;
            span.next_ccw = signed_id;
            span.cw_face = cw_face;
            span.ccw_face = ccw_face;
        }
        Some((minaz, maxaz)) => {
            if azdif < minaz {
                span.next_cw = signed_id;
                span.cw_face = cw_face;
                *minmax = Some((azdif, maxaz));
            } else if azdif > maxaz {
                span.next_ccw = signed_id;
                span.ccw_face = ccw_face;
                *minmax = Some((minaz, azdif));
            }
        }
    }
}

/// Azimuth analysis of both ends of an edge geometry. Fails when the line
/// has no two distinct vertices.
pub(crate) fn edge_spans_from_line(geom: &LineString<f64>) -> TopoResult<(EdgeSpan, EdgeSpan)> {
    let pts = &geom.0;
    if pts.len() < 2 {
        return Err(TopologyError::InvalidGeometry(
            "no two distinct vertices exist",
        ));
    }
    let fp = pts[0];
    let lp = pts[pts.len() - 1];
    let fnext = kernel::first_distinct_vertex(geom, fp, 0, 1)
        .ok_or(TopologyError::InvalidGeometry("no two distinct vertices exist"))?;
    let lnext = kernel::first_distinct_vertex(geom, lp, pts.len() - 1, -1)
        .ok_or(TopologyError::InvalidGeometry("no two distinct vertices exist"))?;
    let start_az = kernel::azimuth(fp, fnext)
        .ok_or(TopologyError::InvalidGeometry("no two distinct vertices exist"))?;
    let end_az = kernel::azimuth(lp, lnext)
        .ok_or(TopologyError::InvalidGeometry("no two distinct vertices exist"))?;
    Ok((EdgeSpan::new(start_az), EdgeSpan::new(end_az)))
}

impl<S: TopoStorage + TopoEvents> Topology<S> {
    /// Find the first edge ends met rotating clockwise and counterclockwise
    /// from `span.my_az` around `node`, and the faces on both flanks.
    ///
    /// `other` is the span of the opposite end of the same edge when that
    /// end is incident to the same node (closed edge): it participates in
    /// the fan as a phantom neighbor, so a closed edge can be its own next
    /// edge. `my_edge` names an existing edge to ignore (geometry change
    /// re-analysis).
    ///
    /// Returns the number of incident edges seen.
    pub(crate) fn find_adjacent_edges(
        &self,
        node: ElemId,
        span: &mut EdgeSpan,
        other: Option<&EdgeSpan>,
        my_edge: Option<ElemId>,
    ) -> TopoResult<usize> {
        span.next_cw = 0;
        span.next_ccw = 0;
        span.cw_face = NULL_ID;
        span.ccw_face = NULL_ID;

        // Angular window seeds: the other end of a closed edge bounds the
        // fan on both flanks until a real neighbor beats it.
        let mut minmax = other.map(|o| {
            let d = kernel::azimuth_diff(o.my_az, span.my_az);
            (d, d)
        });

        let edges = self
            .store
            .get_edge_by_node(&[node], columns::edge::ALL)?;
        let numedges = edges.len();
        debug!(
            "{} edges incident to node {}, matching azimuth {}",
            numedges, node, span.my_az
        );

        for edge in &edges {
            if Some(edge.edge_id) == my_edge {
                continue;
            }
            let clean = kernel::remove_repeated_points(&edge.geom, 0.0);
            if clean.0.len() < 2 {
                return Err(TopologyError::CorruptedTopology(format!(
                    "edge {} does not have two distinct points",
                    edge.edge_id
                )));
            }

            // One candidate end per incidence: outgoing ends expose their
            // left face clockwise of themselves, incoming ends the right.
            if edge.start_node == node {
                let p1 = clean.0[0];
                let p2 = kernel::first_distinct_vertex(&clean, p1, 0, 1).ok_or_else(|| {
                    TopologyError::CorruptedTopology(format!(
                        "edge {} has no distinct vertices",
                        edge.edge_id
                    ))
                })?;
                let az = kernel::azimuth(p1, p2).ok_or_else(|| {
                    TopologyError::CorruptedTopology(format!(
                        "cannot compute azimuth of edge {} start",
                        edge.edge_id
                    ))
                })?;
                let azdif = kernel::azimuth_diff(az, span.my_az);
                consider_edge_end(
                    span,
                    &mut minmax,
                    azdif,
                    edge.edge_id,
                    edge.face_left,
                    edge.face_right,
                );
            }

            if edge.end_node == node {
                let last = clean.0.len() - 1;
                let p1 = clean.0[last];
                let p2 = kernel::first_distinct_vertex(&clean, p1, last, -1).ok_or_else(|| {
                    TopologyError::CorruptedTopology(format!(
                        "edge {} has no distinct vertices",
                        edge.edge_id
                    ))
                })?;
                let az = kernel::azimuth(p1, p2).ok_or_else(|| {
                    TopologyError::CorruptedTopology(format!(
                        "cannot compute azimuth of edge {} end",
                        edge.edge_id
                    ))
                })?;
                let azdif = kernel::azimuth_diff(az, span.my_az);
                consider_edge_end(
                    span,
                    &mut minmax,
                    azdif,
                    -edge.edge_id,
                    edge.face_right,
                    edge.face_left,
                );
            }
        }

        debug!(
            "edges adjacent to azimuth {} at node {}: CW:{} CCW:{}",
            span.my_az, node, span.next_cw, span.next_ccw
        );

        if my_edge.is_none()
            && numedges > 0
            && span.cw_face != span.ccw_face
            && span.cw_face != NULL_ID
            && span.ccw_face != NULL_ID
        {
            return Err(TopologyError::CorruptedTopology(format!(
                "adjacent edges {} and {} bind different faces ({} and {})",
                span.next_cw, span.next_ccw, span.cw_face, span.ccw_face
            )));
        }

        Ok(numedges)
    }
}

/// MBR of an edge geometry, as an error when empty.
pub(crate) fn edge_mbr(geom: &LineString<f64>) -> TopoResult<Rect<f64>> {
    geom.bounding_rect()
        .ok_or(TopologyError::InvalidGeometry("empty linestring"))
}
