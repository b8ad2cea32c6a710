//! In-memory storage backend.
//!
//! `MemTopology` keeps rows in id-ordered maps and answers spatial queries
//! by exact scans over element geometry, which makes it a convenient
//! reference backend for tests and small topologies. Notifications are
//! recorded in an event log instead of being dropped, so callers can assert
//! on what the engine reported.

use std::collections::BTreeMap;

use geo::{BoundingRect, Intersects};
use geo_types::{Point, Rect};

use geo_topo_types::{Edge, ElemId, Face, Node};

use crate::kernel;

use super::{
    EdgeSelect, EdgeUpdate, Limit, NodeSelect, NodeUpdate, StorageError, StorageResult,
    TopoEvents, TopoStorage,
};

/// A notification recorded by [`MemTopology`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    EdgeSplit {
        split: ElemId,
        new1: ElemId,
        new2: Option<ElemId>,
    },
    FaceSplit {
        split: ElemId,
        new1: ElemId,
        new2: Option<ElemId>,
    },
    EdgeHeal {
        e1: ElemId,
        e2: ElemId,
        new_edge: ElemId,
    },
    FaceHeal {
        f1: ElemId,
        f2: ElemId,
        new_face: ElemId,
    },
}

/// Storage backend holding a whole topology in memory.
#[derive(Debug, Default, Clone)]
pub struct MemTopology {
    nodes: BTreeMap<ElemId, Node>,
    edges: BTreeMap<ElemId, Edge>,
    faces: BTreeMap<ElemId, Face>,
    next_node_id: ElemId,
    next_edge_id: ElemId,
    next_face_id: ElemId,
    /// Notifications received from the engine, in source-event order.
    pub events: Vec<Event>,
}

impl MemTopology {
    pub fn new() -> Self {
        MemTopology {
            next_node_id: 1,
            next_edge_id: 1,
            next_face_id: 1,
            ..Default::default()
        }
    }

    pub fn node(&self, id: ElemId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: ElemId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn face(&self, id: ElemId) -> Option<&Face> {
        self.faces.get(&id)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn faces(&self) -> impl Iterator<Item = &Face> {
        self.faces.values()
    }

    fn edge_bbox(edge: &Edge) -> StorageResult<Rect<f64>> {
        edge.geom
            .bounding_rect()
            .ok_or_else(|| StorageError::new(format!("edge {} has empty geometry", edge.edge_id)))
    }

    fn node_matches(node: &Node, sel: &NodeSelect) -> bool {
        sel.node_id.map_or(true, |v| node.node_id == v)
            && sel.containing_face.map_or(true, |v| node.containing_face == v)
    }

    fn edge_matches(edge: &Edge, sel: &EdgeSelect) -> bool {
        sel.edge_id.map_or(true, |v| edge.edge_id == v)
            && sel.start_node.map_or(true, |v| edge.start_node == v)
            && sel.end_node.map_or(true, |v| edge.end_node == v)
            && sel.face_left.map_or(true, |v| edge.face_left == v)
            && sel.face_right.map_or(true, |v| edge.face_right == v)
            && sel.next_left.map_or(true, |v| edge.next_left == v)
            && sel.next_right.map_or(true, |v| edge.next_right == v)
    }

    fn apply_node_update(node: &mut Node, upd: &NodeUpdate) {
        if let Some(f) = upd.containing_face {
            node.containing_face = f;
        }
        if let Some(g) = upd.geom {
            node.geom = g;
        }
    }

    fn apply_edge_update(edge: &mut Edge, upd: &EdgeUpdate) {
        if let Some(v) = upd.start_node {
            edge.start_node = v;
        }
        if let Some(v) = upd.end_node {
            edge.end_node = v;
        }
        if let Some(v) = upd.face_left {
            edge.face_left = v;
        }
        if let Some(v) = upd.face_right {
            edge.face_right = v;
        }
        if let Some(v) = upd.next_left {
            edge.next_left = v;
        }
        if let Some(v) = upd.next_right {
            edge.next_right = v;
        }
        if let Some(g) = &upd.geom {
            edge.geom = g.clone();
        }
    }
}

impl TopoStorage for MemTopology {
    fn get_node_by_id(&self, ids: &[ElemId], _fields: u32) -> StorageResult<Vec<Node>> {
        Ok(ids.iter().filter_map(|id| self.nodes.get(id).cloned()).collect())
    }

    fn get_edge_by_id(&self, ids: &[ElemId], _fields: u32) -> StorageResult<Vec<Edge>> {
        Ok(ids.iter().filter_map(|id| self.edges.get(id).cloned()).collect())
    }

    fn get_face_by_id(&self, ids: &[ElemId], _fields: u32) -> StorageResult<Vec<Face>> {
        Ok(ids.iter().filter_map(|id| self.faces.get(id).cloned()).collect())
    }

    fn get_node_within_box(
        &self,
        bbox: Option<&Rect<f64>>,
        _fields: u32,
        limit: Limit,
    ) -> StorageResult<Vec<Node>> {
        Ok(self
            .nodes
            .values()
            .filter(|n| bbox.map_or(true, |b| kernel::rect_contains(b, n.geom.0)))
            .take(limit.cap())
            .cloned()
            .collect())
    }

    fn get_edge_within_box(
        &self,
        bbox: Option<&Rect<f64>>,
        _fields: u32,
        limit: Limit,
    ) -> StorageResult<Vec<Edge>> {
        let mut out = Vec::new();
        for e in self.edges.values() {
            let keep = match bbox {
                None => true,
                Some(b) => Self::edge_bbox(e)?.intersects(b),
            };
            if keep {
                out.push(e.clone());
                if out.len() >= limit.cap() {
                    break;
                }
            }
        }
        Ok(out)
    }

    fn get_face_within_box(
        &self,
        bbox: Option<&Rect<f64>>,
        _fields: u32,
        limit: Limit,
    ) -> StorageResult<Vec<Face>> {
        Ok(self
            .faces
            .values()
            .filter(|f| bbox.map_or(true, |b| f.mbr.intersects(b)))
            .take(limit.cap())
            .cloned()
            .collect())
    }

    fn get_node_within_distance(
        &self,
        pt: &Point<f64>,
        dist: f64,
        _fields: u32,
        limit: Limit,
    ) -> StorageResult<Vec<Node>> {
        let q = pt.0;
        Ok(self
            .nodes
            .values()
            .filter(|n| {
                let d = ((n.geom.x() - q.x).powi(2) + (n.geom.y() - q.y).powi(2)).sqrt();
                d <= dist
            })
            .take(limit.cap())
            .cloned()
            .collect())
    }

    fn get_edge_within_distance(
        &self,
        pt: &Point<f64>,
        dist: f64,
        _fields: u32,
        limit: Limit,
    ) -> StorageResult<Vec<Edge>> {
        Ok(self
            .edges
            .values()
            .filter(|e| kernel::point_line_distance(&e.geom, pt.0) <= dist)
            .take(limit.cap())
            .cloned()
            .collect())
    }

    fn get_closest_edge(&self, pt: &Point<f64>, _fields: u32) -> StorageResult<Option<Edge>> {
        let mut best: Option<(f64, &Edge)> = None;
        for e in self.edges.values() {
            let d = kernel::point_line_distance(&e.geom, pt.0);
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, e));
            }
        }
        Ok(best.map(|(_, e)| e.clone()))
    }

    fn get_edge_by_node(&self, node_ids: &[ElemId], _fields: u32) -> StorageResult<Vec<Edge>> {
        Ok(self
            .edges
            .values()
            .filter(|e| node_ids.contains(&e.start_node) || node_ids.contains(&e.end_node))
            .cloned()
            .collect())
    }

    fn get_edge_by_face(
        &self,
        face_ids: &[ElemId],
        _fields: u32,
        bbox: Option<&Rect<f64>>,
    ) -> StorageResult<Vec<Edge>> {
        let mut out = Vec::new();
        for e in self.edges.values() {
            if !face_ids.contains(&e.face_left) && !face_ids.contains(&e.face_right) {
                continue;
            }
            if let Some(b) = bbox {
                if !Self::edge_bbox(e)?.intersects(b) {
                    continue;
                }
            }
            out.push(e.clone());
        }
        Ok(out)
    }

    fn get_node_by_face(
        &self,
        face_ids: &[ElemId],
        _fields: u32,
        bbox: Option<&Rect<f64>>,
    ) -> StorageResult<Vec<Node>> {
        Ok(self
            .nodes
            .values()
            .filter(|n| face_ids.contains(&n.containing_face))
            .filter(|n| bbox.map_or(true, |b| kernel::rect_contains(b, n.geom.0)))
            .cloned()
            .collect())
    }

    fn get_next_edge_id(&mut self) -> StorageResult<ElemId> {
        let id = self.next_edge_id;
        self.next_edge_id += 1;
        Ok(id)
    }

    fn compute_face_mbr(&self, face_id: ElemId) -> StorageResult<Rect<f64>> {
        let mut mbr: Option<Rect<f64>> = None;
        for e in self.edges.values() {
            if e.face_left != face_id && e.face_right != face_id {
                continue;
            }
            let b = Self::edge_bbox(e)?;
            mbr = Some(match mbr {
                None => b,
                Some(m) => kernel::rect_union(&m, &b),
            });
        }
        mbr.ok_or_else(|| StorageError::new(format!("face {} has no boundary edges", face_id)))
    }

    fn get_ring_edges(
        &self,
        signed_edge: ElemId,
        limit: Option<usize>,
    ) -> StorageResult<Vec<ElemId>> {
        // A ring can visit each edge at most once per side.
        let cap = limit.unwrap_or(self.edges.len() * 2 + 1);
        let mut out = Vec::new();
        let mut cur = signed_edge;
        loop {
            let edge = self
                .edges
                .get(&cur.abs())
                .ok_or_else(|| StorageError::new(format!("non-existent ring edge {}", cur)))?;
            out.push(cur);
            cur = if cur > 0 { edge.next_left } else { edge.next_right };
            if cur == signed_edge {
                return Ok(out);
            }
            if out.len() >= cap {
                return Err(StorageError::new(format!(
                    "ring of edge {} exceeded {} steps",
                    signed_edge, cap
                )));
            }
        }
    }

    fn insert_nodes(&mut self, nodes: &mut [Node]) -> StorageResult<()> {
        for n in nodes {
            if n.node_id <= 0 {
                n.node_id = self.next_node_id;
                self.next_node_id += 1;
            } else if n.node_id >= self.next_node_id {
                self.next_node_id = n.node_id + 1;
            }
            if self.nodes.insert(n.node_id, n.clone()).is_some() {
                return Err(StorageError::new(format!("duplicate node id {}", n.node_id)));
            }
        }
        Ok(())
    }

    fn insert_edges(&mut self, edges: &mut [Edge]) -> StorageResult<()> {
        for e in edges {
            if e.edge_id <= 0 {
                let is_self_loop = e.next_left == -e.edge_id && e.next_right == e.edge_id;
                e.edge_id = self.next_edge_id;
                self.next_edge_id += 1;
                if is_self_loop {
                    e.next_left = -e.edge_id;
                    e.next_right = e.edge_id;
                }
            } else if e.edge_id >= self.next_edge_id {
                self.next_edge_id = e.edge_id + 1;
            }
            if self.edges.insert(e.edge_id, e.clone()).is_some() {
                return Err(StorageError::new(format!("duplicate edge id {}", e.edge_id)));
            }
        }
        Ok(())
    }

    fn insert_faces(&mut self, faces: &mut [Face]) -> StorageResult<()> {
        for f in faces {
            if f.face_id <= 0 {
                f.face_id = self.next_face_id;
                self.next_face_id += 1;
            } else if f.face_id >= self.next_face_id {
                self.next_face_id = f.face_id + 1;
            }
            if self.faces.insert(f.face_id, f.clone()).is_some() {
                return Err(StorageError::new(format!("duplicate face id {}", f.face_id)));
            }
        }
        Ok(())
    }

    fn update_nodes(
        &mut self,
        sel: &NodeSelect,
        upd: &NodeUpdate,
        exc: Option<&NodeSelect>,
    ) -> StorageResult<u64> {
        let mut count = 0;
        for n in self.nodes.values_mut() {
            if !Self::node_matches(n, sel) {
                continue;
            }
            if exc.is_some_and(|x| Self::node_matches(n, x)) {
                continue;
            }
            Self::apply_node_update(n, upd);
            count += 1;
        }
        Ok(count)
    }

    fn update_edges(
        &mut self,
        sel: &EdgeSelect,
        upd: &EdgeUpdate,
        exc: Option<&EdgeSelect>,
    ) -> StorageResult<u64> {
        let mut count = 0;
        for e in self.edges.values_mut() {
            if !Self::edge_matches(e, sel) {
                continue;
            }
            if exc.is_some_and(|x| Self::edge_matches(e, x)) {
                continue;
            }
            Self::apply_edge_update(e, upd);
            count += 1;
        }
        Ok(count)
    }

    fn update_faces_by_id(&mut self, faces: &[Face]) -> StorageResult<u64> {
        let mut count = 0;
        for f in faces {
            if let Some(row) = self.faces.get_mut(&f.face_id) {
                row.mbr = f.mbr;
                count += 1;
            }
        }
        Ok(count)
    }

    fn update_edges_by_id(&mut self, updates: &[(ElemId, EdgeUpdate)]) -> StorageResult<u64> {
        let mut count = 0;
        for (id, upd) in updates {
            if let Some(e) = self.edges.get_mut(id) {
                Self::apply_edge_update(e, upd);
                count += 1;
            }
        }
        Ok(count)
    }

    fn update_nodes_by_id(&mut self, updates: &[(ElemId, NodeUpdate)]) -> StorageResult<u64> {
        let mut count = 0;
        for (id, upd) in updates {
            if let Some(n) = self.nodes.get_mut(id) {
                Self::apply_node_update(n, upd);
                count += 1;
            }
        }
        Ok(count)
    }

    fn delete_edges(&mut self, sel: &EdgeSelect) -> StorageResult<u64> {
        let doomed: Vec<ElemId> = self
            .edges
            .values()
            .filter(|e| Self::edge_matches(e, sel))
            .map(|e| e.edge_id)
            .collect();
        for id in &doomed {
            self.edges.remove(id);
        }
        Ok(doomed.len() as u64)
    }

    fn delete_nodes_by_id(&mut self, ids: &[ElemId]) -> StorageResult<u64> {
        let mut count = 0;
        for id in ids {
            if self.nodes.remove(id).is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn delete_faces_by_id(&mut self, ids: &[ElemId]) -> StorageResult<u64> {
        let mut count = 0;
        for id in ids {
            if self.faces.remove(id).is_some() {
                count += 1;
            }
        }
        Ok(count)
    }
}

impl TopoEvents for MemTopology {
    fn on_edge_split(
        &mut self,
        split: ElemId,
        new1: ElemId,
        new2: Option<ElemId>,
    ) -> StorageResult<()> {
        self.events.push(Event::EdgeSplit { split, new1, new2 });
        Ok(())
    }

    fn on_face_split(
        &mut self,
        split: ElemId,
        new1: ElemId,
        new2: Option<ElemId>,
    ) -> StorageResult<()> {
        self.events.push(Event::FaceSplit { split, new1, new2 });
        Ok(())
    }

    fn on_edge_heal(&mut self, e1: ElemId, e2: ElemId, new_edge: ElemId) -> StorageResult<()> {
        self.events.push(Event::EdgeHeal { e1, e2, new_edge });
        Ok(())
    }

    fn on_face_heal(&mut self, f1: ElemId, f2: ElemId, new_face: ElemId) -> StorageResult<()> {
        self.events.push(Event::FaceHeal { f1, f2, new_face });
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use geo_types::{line_string, point, Coord};

    fn edge(id: ElemId, start: ElemId, end: ElemId) -> Edge {
        Edge {
            edge_id: id,
            start_node: start,
            end_node: end,
            face_left: 0,
            face_right: 0,
            next_left: -id,
            next_right: id,
            geom: line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
        }
    }

    #[test]
    fn insert_assigns_ids() {
        let mut store = MemTopology::new();
        let mut nodes = vec![
            Node::new(point!(x: 0.0, y: 0.0), 0),
            Node::new(point!(x: 1.0, y: 1.0), 0),
        ];
        store.insert_nodes(&mut nodes).unwrap();
        assert_eq!(nodes[0].node_id, 1);
        assert_eq!(nodes[1].node_id, 2);
        assert_eq!(store.num_nodes(), 2);
    }

    #[test]
    fn select_and_exclude() {
        let mut store = MemTopology::new();
        let mut edges = vec![edge(0, 1, 2), edge(0, 2, 3)];
        store.insert_edges(&mut edges).unwrap();
        let touched = store
            .update_edges(
                &EdgeSelect {
                    start_node: Some(2),
                    ..Default::default()
                },
                &EdgeUpdate {
                    face_left: Some(7),
                    ..Default::default()
                },
                Some(&EdgeSelect {
                    edge_id: Some(edges[0].edge_id),
                    ..Default::default()
                }),
            )
            .unwrap();
        assert_eq!(touched, 1);
        assert_eq!(store.edge(edges[1].edge_id).unwrap().face_left, 7);
        assert_eq!(store.edge(edges[0].edge_id).unwrap().face_left, 0);
    }

    #[test]
    fn ring_walk_of_isolated_edge() {
        let mut store = MemTopology::new();
        let mut edges = vec![edge(0, 1, 2)];
        store.insert_edges(&mut edges).unwrap();
        let id = edges[0].edge_id;
        assert_eq!(store.get_ring_edges(id, None).unwrap(), vec![id, -id]);
        assert_eq!(store.get_ring_edges(-id, None).unwrap(), vec![-id, id]);
    }

    #[test]
    fn closest_edge_prefers_lowest_id_on_tie() {
        let mut store = MemTopology::new();
        let mut edges = vec![edge(0, 1, 2), edge(0, 3, 4)];
        store.insert_edges(&mut edges).unwrap();
        let hit = store
            .get_closest_edge(&point!(x: 5.0, y: 3.0), 0)
            .unwrap()
            .unwrap();
        assert_eq!(hit.edge_id, edges[0].edge_id);
    }

    #[test]
    fn box_queries_are_inclusive() {
        let mut store = MemTopology::new();
        let mut nodes = vec![Node::new(point!(x: 5.0, y: 5.0), 0)];
        store.insert_nodes(&mut nodes).unwrap();
        let bbox = Rect::new(Coord { x: 5.0, y: 5.0 }, Coord { x: 6.0, y: 6.0 });
        let found = store
            .get_node_within_box(Some(&bbox), 0, Limit::All)
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
