//! Abstract storage of topology element rows.
//!
//! The engine performs every read and write through [`TopoStorage`] and
//! reports structural changes through [`TopoEvents`], so the persistence
//! layer (a database, a file, the bundled [`MemTopology`]) stays fully
//! decoupled from the topological algorithms. A mutation is expected to run
//! inside a serializing transaction: when an operation returns an error the
//! backend must roll its writes back.

use std::fmt;

use geo_types::{LineString, Point, Rect};

use geo_topo_types::{Edge, ElemId, Face, Node};

mod memory;
pub use memory::{Event, MemTopology};

/// A backend failure; the message is forwarded to the engine caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError(String);

impl StorageError {
    pub fn new(msg: impl Into<String>) -> Self {
        StorageError(msg.into())
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for StorageError {}

pub type StorageResult<T> = Result<T, StorageError>;

/// How many rows a read should produce.
///
/// `Existence` is an "is there any match" probe: the backend may return at
/// most one row, the caller only looks at emptiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    All,
    AtMost(usize),
    Existence,
}

impl Limit {
    pub(crate) fn cap(self) -> usize {
        match self {
            Limit::All => usize::MAX,
            Limit::AtMost(n) => n,
            Limit::Existence => 1,
        }
    }
}

/// Row filter for nodes: a row matches when every `Some` field compares
/// equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSelect {
    pub node_id: Option<ElemId>,
    pub containing_face: Option<ElemId>,
}

/// Partial node update: only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdate {
    pub containing_face: Option<ElemId>,
    pub geom: Option<Point<f64>>,
}

/// Row filter for edges, `Some`-fields-all-equal semantics as
/// [`NodeSelect`]. `next_left`/`next_right` match the stored signed values
/// exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeSelect {
    pub edge_id: Option<ElemId>,
    pub start_node: Option<ElemId>,
    pub end_node: Option<ElemId>,
    pub face_left: Option<ElemId>,
    pub face_right: Option<ElemId>,
    pub next_left: Option<ElemId>,
    pub next_right: Option<ElemId>,
}

/// Partial edge update: only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeUpdate {
    pub start_node: Option<ElemId>,
    pub end_node: Option<ElemId>,
    pub face_left: Option<ElemId>,
    pub face_right: Option<ElemId>,
    pub next_left: Option<ElemId>,
    pub next_right: Option<ElemId>,
    pub geom: Option<LineString<f64>>,
}

/// CRUD over one topology's rows.
///
/// Reads take a column mask (see [`geo_topo_types::columns`]) naming the
/// columns the engine will look at; backends are free to leave the others at
/// arbitrary values. Geometry-valued reads return owned rows, dropped by the
/// engine before the primitive returns.
pub trait TopoStorage {
    fn get_node_by_id(&self, ids: &[ElemId], fields: u32) -> StorageResult<Vec<Node>>;
    fn get_edge_by_id(&self, ids: &[ElemId], fields: u32) -> StorageResult<Vec<Edge>>;
    fn get_face_by_id(&self, ids: &[ElemId], fields: u32) -> StorageResult<Vec<Face>>;

    /// Nodes whose point falls inside `bbox` (`None` means every node).
    fn get_node_within_box(
        &self,
        bbox: Option<&Rect<f64>>,
        fields: u32,
        limit: Limit,
    ) -> StorageResult<Vec<Node>>;
    /// Edges whose MBR intersects `bbox` (`None` means every edge).
    fn get_edge_within_box(
        &self,
        bbox: Option<&Rect<f64>>,
        fields: u32,
        limit: Limit,
    ) -> StorageResult<Vec<Edge>>;
    /// Faces whose MBR intersects `bbox` (`None` means every face).
    fn get_face_within_box(
        &self,
        bbox: Option<&Rect<f64>>,
        fields: u32,
        limit: Limit,
    ) -> StorageResult<Vec<Face>>;

    fn get_node_within_distance(
        &self,
        pt: &Point<f64>,
        dist: f64,
        fields: u32,
        limit: Limit,
    ) -> StorageResult<Vec<Node>>;
    fn get_edge_within_distance(
        &self,
        pt: &Point<f64>,
        dist: f64,
        fields: u32,
        limit: Limit,
    ) -> StorageResult<Vec<Edge>>;

    /// The edge closest to `pt`, `None` on an edge-less topology. Ties must
    /// break deterministically (lowest edge id).
    fn get_closest_edge(&self, pt: &Point<f64>, fields: u32) -> StorageResult<Option<Edge>>;

    /// Edges incident to any of the given nodes (as start or end).
    fn get_edge_by_node(&self, node_ids: &[ElemId], fields: u32) -> StorageResult<Vec<Edge>>;
    /// Edges bounding any of the given faces on either side, optionally
    /// restricted to those whose MBR intersects `bbox`.
    fn get_edge_by_face(
        &self,
        face_ids: &[ElemId],
        fields: u32,
        bbox: Option<&Rect<f64>>,
    ) -> StorageResult<Vec<Edge>>;
    /// Isolated nodes contained in any of the given faces, optionally
    /// restricted to `bbox`.
    fn get_node_by_face(
        &self,
        face_ids: &[ElemId],
        fields: u32,
        bbox: Option<&Rect<f64>>,
    ) -> StorageResult<Vec<Node>>;

    /// Allocate the next edge identifier.
    fn get_next_edge_id(&mut self) -> StorageResult<ElemId>;

    /// Backend-side face location, if the backend offers one. `Ok(None)`
    /// means "unknown" and makes the engine fall back to its own resolver.
    fn get_face_containing_point(&self, pt: &Point<f64>) -> StorageResult<Option<ElemId>> {
        let _ = pt;
        Ok(None)
    }

    /// MBR of the face's boundary, recomputed from its current edges.
    fn compute_face_mbr(&self, face_id: ElemId) -> StorageResult<Rect<f64>>;

    /// The ordered signed-edge cycle starting at `signed_edge`, following
    /// `next_left` for positive ids and `next_right` for negative ones.
    /// Aborts with an error when the walk exceeds `limit` steps.
    fn get_ring_edges(
        &self,
        signed_edge: ElemId,
        limit: Option<usize>,
    ) -> StorageResult<Vec<ElemId>>;

    /// Insert rows, assigning fresh ids to rows whose id is not positive and
    /// writing the assigned ids back.
    fn insert_nodes(&mut self, nodes: &mut [Node]) -> StorageResult<()>;
    fn insert_edges(&mut self, edges: &mut [Edge]) -> StorageResult<()>;
    fn insert_faces(&mut self, faces: &mut [Face]) -> StorageResult<()>;

    /// Update rows matching `sel` and not matching `exc`; returns the
    /// number of rows touched.
    fn update_nodes(
        &mut self,
        sel: &NodeSelect,
        upd: &NodeUpdate,
        exc: Option<&NodeSelect>,
    ) -> StorageResult<u64>;
    fn update_edges(
        &mut self,
        sel: &EdgeSelect,
        upd: &EdgeUpdate,
        exc: Option<&EdgeSelect>,
    ) -> StorageResult<u64>;

    fn update_faces_by_id(&mut self, faces: &[Face]) -> StorageResult<u64>;
    fn update_edges_by_id(&mut self, updates: &[(ElemId, EdgeUpdate)]) -> StorageResult<u64>;
    fn update_nodes_by_id(&mut self, updates: &[(ElemId, NodeUpdate)]) -> StorageResult<u64>;

    fn delete_edges(&mut self, sel: &EdgeSelect) -> StorageResult<u64>;
    fn delete_nodes_by_id(&mut self, ids: &[ElemId]) -> StorageResult<u64>;
    fn delete_faces_by_id(&mut self, ids: &[ElemId]) -> StorageResult<u64>;
}

/// Notifications the engine emits so layers keeping element bookkeeping
/// (feature composition tables and the like) stay consistent. Every method
/// defaults to a no-op; the `check_*` hooks may veto a removal by returning
/// an error, which the engine surfaces verbatim.
pub trait TopoEvents {
    fn on_edge_split(
        &mut self,
        split: ElemId,
        new1: ElemId,
        new2: Option<ElemId>,
    ) -> StorageResult<()> {
        let _ = (split, new1, new2);
        Ok(())
    }

    fn on_face_split(
        &mut self,
        split: ElemId,
        new1: ElemId,
        new2: Option<ElemId>,
    ) -> StorageResult<()> {
        let _ = (split, new1, new2);
        Ok(())
    }

    fn on_edge_heal(&mut self, e1: ElemId, e2: ElemId, new_edge: ElemId) -> StorageResult<()> {
        let _ = (e1, e2, new_edge);
        Ok(())
    }

    fn on_face_heal(&mut self, f1: ElemId, f2: ElemId, new_face: ElemId) -> StorageResult<()> {
        let _ = (f1, f2, new_face);
        Ok(())
    }

    fn check_remove_edge(
        &mut self,
        edge_id: ElemId,
        face_left: ElemId,
        face_right: ElemId,
    ) -> StorageResult<()> {
        let _ = (edge_id, face_left, face_right);
        Ok(())
    }

    fn check_remove_iso_edge(&mut self, edge_id: ElemId) -> StorageResult<()> {
        let _ = edge_id;
        Ok(())
    }

    fn check_remove_node(&mut self, node_id: ElemId, e1: ElemId, e2: ElemId) -> StorageResult<()> {
        let _ = (node_id, e1, e2);
        Ok(())
    }

    fn check_remove_iso_node(&mut self, node_id: ElemId) -> StorageResult<()> {
        let _ = node_id;
        Ok(())
    }
}
