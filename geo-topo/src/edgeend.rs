//! The azimuth-sorted star of edge ends around a node.
//!
//! Each edge incident to a node contributes one end per incidence (two for
//! a closed edge). Sorting the ends by azimuth yields the cyclic order the
//! `next_left`/`next_right` links must respect; the population layer uses
//! the star to recompute linking after snapping an edge onto an existing
//! node.

use geo_topo_types::{Edge, ElemId};

use crate::error::{TopoResult, TopologyError};
use crate::kernel;

/// One attachment of an edge to the star's node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EdgeEnd {
    pub edge_id: ElemId,
    /// True when the star node is the edge's start node.
    pub outgoing: bool,
    /// Direction the edge leaves the node with.
    pub azimuth: f64,
}

impl EdgeEnd {
    /// Signed identifier: positive for outgoing ends.
    pub fn signed_id(&self) -> ElemId {
        if self.outgoing {
            self.edge_id
        } else {
            -self.edge_id
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EdgeEndStar {
    node_id: ElemId,
    ends: Vec<EdgeEnd>,
    sorted: bool,
}

impl EdgeEndStar {
    pub fn new(node_id: ElemId) -> Self {
        EdgeEndStar {
            node_id,
            ends: Vec::new(),
            sorted: false,
        }
    }

    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// Register the (one or two) ends of `edge` incident to the star node.
    pub fn add_edge(&mut self, edge: &Edge) -> TopoResult<()> {
        let mut any = false;
        if edge.start_node == self.node_id {
            self.ends.push(end_of(edge, true)?);
            any = true;
        }
        if edge.end_node == self.node_id {
            self.ends.push(end_of(edge, false)?);
            any = true;
        }
        if !any {
            return Err(TopologyError::CorruptedTopology(format!(
                "edge {} doesn't start nor end on star node {}",
                edge.edge_id, self.node_id
            )));
        }
        self.sorted = false;
        Ok(())
    }

    fn ensure_sorted(&mut self) {
        if !self.sorted {
            self.ends.sort_by(|a, b| {
                a.azimuth
                    .partial_cmp(&b.azimuth)
                    .unwrap()
                    .then(a.edge_id.cmp(&b.edge_id))
                    .then(a.outgoing.cmp(&b.outgoing))
            });
            self.sorted = true;
        }
    }

    fn position(&mut self, edge_id: ElemId, outgoing: bool) -> TopoResult<usize> {
        self.ensure_sorted();
        self.ends
            .iter()
            .position(|e| e.edge_id == edge_id && e.outgoing == outgoing)
            .ok_or_else(|| {
                TopologyError::CorruptedTopology(format!(
                    "{} edge {} not found in star of node {}",
                    if outgoing { "outgoing" } else { "incoming" },
                    edge_id,
                    self.node_id
                ))
            })
    }

    /// The edge end met next when rotating clockwise from the given end.
    pub fn next_cw(&mut self, edge_id: ElemId, outgoing: bool) -> TopoResult<EdgeEnd> {
        let i = self.position(edge_id, outgoing)?;
        Ok(self.ends[(i + 1) % self.ends.len()])
    }

    /// The edge end met next when rotating counterclockwise.
    pub fn next_ccw(&mut self, edge_id: ElemId, outgoing: bool) -> TopoResult<EdgeEnd> {
        let i = self.position(edge_id, outgoing)?;
        Ok(self.ends[(i + self.ends.len() - 1) % self.ends.len()])
    }
}

fn end_of(edge: &Edge, outgoing: bool) -> TopoResult<EdgeEnd> {
    let pts = &edge.geom.0;
    if pts.len() < 2 {
        return Err(TopologyError::CorruptedTopology(format!(
            "edge {} has less than two vertices",
            edge.edge_id
        )));
    }
    let (p0, from, dir) = if outgoing {
        (pts[0], 0, 1)
    } else {
        (pts[pts.len() - 1], pts.len() - 1, -1)
    };
    let p1 = kernel::first_distinct_vertex(&edge.geom, p0, from, dir).ok_or_else(|| {
        TopologyError::CorruptedTopology(format!("no distinct vertices in edge {}", edge.edge_id))
    })?;
    let azimuth = kernel::azimuth(p0, p1).ok_or_else(|| {
        TopologyError::CorruptedTopology(format!(
            "cannot compute azimuth of edge {} end",
            edge.edge_id
        ))
    })?;
    Ok(EdgeEnd {
        edge_id: edge.edge_id,
        outgoing,
        azimuth,
    })
}
