//! Tolerance-aware population: integrate raw points, lines and polygons
//! into the topology, snapping and noding against what is already there.

use geo::{BoundingRect, InteriorPoint};
use geo_types::{Coord, Geometry, LineString, Point, Polygon, Rect};
use log::debug;

use geo_topo_types::{columns, Edge, ElemId, NULL_ID};

use crate::error::{TopoResult, TopologyError};
use crate::kernel::{self, RingPosition};
use crate::linework;
use crate::storage::{EdgeSelect, EdgeUpdate, Limit, TopoEvents, TopoStorage};

use super::add_edge::FaceHandling;
use super::{edge_mbr, Topology};

fn point_rect(pt: &Point<f64>) -> Rect<f64> {
    Rect::new(pt.0, pt.0)
}

/// True when the (closed) polygon covers the coordinate: inside or on the
/// exterior ring, and not strictly inside any hole.
fn polygon_covers(poly: &Polygon<f64>, c: Coord<f64>) -> bool {
    if kernel::point_in_ring(poly.exterior(), c) == RingPosition::Outside {
        return false;
    }
    poly.interiors()
        .iter()
        .all(|hole| kernel::point_in_ring(hole, c) != RingPosition::Inside)
}

impl<S: TopoStorage + TopoEvents> Topology<S> {
    /// Integrate a point: reuse a node within tolerance, split an edge
    /// within tolerance at the point's projection, or add an isolated
    /// node. Returns the node id and whether the input had to move.
    pub fn add_point(&mut self, pt: &Point<f64>, tol: f64) -> TopoResult<(ElemId, bool)> {
        self.add_point_impl(pt, tol, true)
    }

    pub(crate) fn add_point_impl(
        &mut self,
        pt: &Point<f64>,
        tol: f64,
        find_face: bool,
    ) -> TopoResult<(ElemId, bool)> {
        let tol = self.tolerance_for(tol, Some(&point_rect(pt)));
        debug!("adding point ({} {}) with tolerance {}", pt.x(), pt.y(), tol);

        let nodes = self.store.get_node_within_distance(
            pt,
            tol,
            columns::node::NODE_ID | columns::node::GEOM,
            Limit::All,
        )?;
        let mut best: Option<(f64, ElemId)> = None;
        for n in &nodes {
            let d = kernel::point_distance(n.geom.0, pt.0);
            if d != 0.0 && d >= tol {
                continue;
            }
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, n.node_id));
            }
        }
        if let Some((d, id)) = best {
            return Ok((id, d != 0.0));
        }

        let edges =
            self.store
                .get_edge_within_distance(pt, tol, columns::edge::ALL, Limit::All)?;
        if !edges.is_empty() {
            if let Some(found) = self.split_all_edges_to_new_node(&edges, pt, tol)? {
                return Ok(found);
            }
        }

        let id = self.add_iso_node_impl(NULL_ID, *pt, false, find_face)?;
        Ok((id, false))
    }

    /// Split the closest in-tolerance edge at the point's projection, and
    /// snap every other in-tolerance edge onto the resulting node.
    fn split_all_edges_to_new_node(
        &mut self,
        edges: &[Edge],
        pt: &Point<f64>,
        tol: f64,
    ) -> TopoResult<Option<(ElemId, bool)>> {
        let mut scored: Vec<(f64, &Edge)> = edges
            .iter()
            .filter_map(|e| {
                let d = kernel::point_line_distance(&e.geom, pt.0);
                (d < tol).then_some((d, e))
            })
            .collect();
        if scored.is_empty() {
            return Ok(None);
        }
        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap()
                .then(a.1.edge_id.cmp(&b.1.edge_id))
        });

        let closest = scored[0].1;
        let hit = kernel::closest_point_on_line(&closest.geom, pt.0).ok_or_else(|| {
            TopologyError::CorruptedTopology(format!("edge {} is collapsed", closest.edge_id))
        })?;
        let prj = hit.point;
        let moved = prj != pt.0;
        debug!(
            "point projects on edge {} at ({} {}), {} edges within tolerance",
            closest.edge_id,
            prj.x,
            prj.y,
            scored.len()
        );

        if !kernel::point_on_line(&closest.geom, prj) {
            // The projection missed the edge path (floating point): bend
            // the edge through it first, re-adding the start point in case
            // the snap consumed it.
            let mut snapped = linework::snap_line(&closest.geom, &[prj], tol);
            if snapped.0[0] != closest.geom.0[0] {
                snapped.0.insert(0, closest.geom.0[0]);
            }
            self.change_edge_geom(closest.edge_id, snapped)?;
        }
        let node_id = self.mod_edge_split(closest.edge_id, Point::from(prj), false)?;

        for (_, e) in &scored[1..] {
            self.snap_edge_to_existing_node(e.edge_id, node_id, prj, tol)?;
        }

        Ok(Some((node_id, moved)))
    }

    /// Snap an edge's geometry onto an existing node and split the edge
    /// there, re-deriving the linking of every edge end around the node
    /// from the azimuth-sorted star.
    fn snap_edge_to_existing_node(
        &mut self,
        edge_id: ElemId,
        node_id: ElemId,
        node_pt: Coord<f64>,
        tol: f64,
    ) -> TopoResult<()> {
        let edge = self.load_edge(edge_id, columns::edge::ALL)?;
        if edge.start_node == node_id || edge.end_node == node_id {
            return Ok(());
        }

        let mut geom = edge.geom.clone();
        if !geom.0.contains(&node_pt) {
            geom = linework::snap_line(&geom, &[node_pt], tol);
            if geom.0[0] != edge.geom.0[0] {
                geom.0.insert(0, edge.geom.0[0]);
            }
            if geom.0.last() != edge.geom.0.last() {
                geom.0.push(edge.geom.0[edge.geom.0.len() - 1]);
            }
        }
        let (first, second) = kernel::split_line_at_point(&geom, node_pt).ok_or_else(|| {
            TopologyError::CorruptedTopology(format!(
                "cannot snap edge {} to node {}",
                edge_id, node_id
            ))
        })?;

        self.check_edge_crossing(edge.start_node, node_id, &first, Some(edge_id))?;
        self.check_edge_crossing(node_id, edge.end_node, &second, Some(edge_id))?;

        // Same surgery as a modifying split, except the node already
        // exists and its star may hold other edge ends: insert the second
        // half, shorten the original, then let the star restate the links
        // around the node.
        let new_id = self.store.get_next_edge_id()?;
        let mut new_edges = [Edge {
            edge_id: new_id,
            start_node: node_id,
            end_node: edge.end_node,
            face_left: edge.face_left,
            face_right: edge.face_right,
            next_left: if edge.next_left == -edge_id {
                -new_id
            } else {
                edge.next_left
            },
            next_right: -edge_id,
            geom: second,
        }];
        self.store.insert_edges(&mut new_edges)?;

        self.store.update_edges(
            &EdgeSelect {
                edge_id: Some(edge_id),
                ..Default::default()
            },
            &EdgeUpdate {
                geom: Some(first),
                end_node: Some(node_id),
                next_left: Some(new_id),
                ..Default::default()
            },
            None,
        )?;

        let exclude_new = EdgeSelect {
            edge_id: Some(new_id),
            ..Default::default()
        };
        self.store.update_edges(
            &EdgeSelect {
                next_right: Some(-edge_id),
                start_node: Some(edge.end_node),
                ..Default::default()
            },
            &EdgeUpdate {
                next_right: Some(-new_id),
                ..Default::default()
            },
            Some(&exclude_new),
        )?;
        self.store.update_edges(
            &EdgeSelect {
                next_left: Some(-edge_id),
                end_node: Some(edge.end_node),
                ..Default::default()
            },
            &EdgeUpdate {
                next_left: Some(-new_id),
                ..Default::default()
            },
            Some(&exclude_new),
        )?;

        self.relink_node_star(node_id)?;

        self.store.on_edge_split(edge_id, new_id, None)?;
        self.refresh_face_mbrs(&[edge.face_left, edge.face_right])?;
        debug!(
            "snapped edge {} onto node {}, new edge {}",
            edge_id, node_id, new_id
        );
        Ok(())
    }

    /// Recompute the `next_left`/`next_right` links of every edge end
    /// around a node from azimuth order.
    fn relink_node_star(&mut self, node_id: ElemId) -> TopoResult<()> {
        let edges = self.store.get_edge_by_node(&[node_id], columns::edge::ALL)?;
        let mut star = crate::edgeend::EdgeEndStar::new(node_id);
        for e in &edges {
            star.add_edge(e)?;
        }
        let mut updates: Vec<(ElemId, EdgeUpdate)> = Vec::new();
        for e in &edges {
            if e.start_node == node_id {
                let next = star.next_cw(e.edge_id, true)?.signed_id();
                if e.next_right != next {
                    updates.push((
                        e.edge_id,
                        EdgeUpdate {
                            next_right: Some(next),
                            ..Default::default()
                        },
                    ));
                }
            }
            if e.end_node == node_id {
                let next = star.next_cw(e.edge_id, false)?.signed_id();
                if e.next_left != next {
                    updates.push((
                        e.edge_id,
                        EdgeUpdate {
                            next_left: Some(next),
                            ..Default::default()
                        },
                    ));
                }
            }
        }
        if !updates.is_empty() {
            self.store.update_edges_by_id(&updates)?;
        }
        Ok(())
    }

    /// Integrate a line within tolerance. Returns the signed identifiers
    /// of the edges the line decomposed into (negative when the edge runs
    /// against the input direction).
    pub fn add_line(&mut self, line: &LineString<f64>, tol: f64) -> TopoResult<Vec<ElemId>> {
        self.add_line_impl(line, tol, true)
    }

    /// As [`Topology::add_line`] but without face maintenance: new edges
    /// get no face on either side, pending a later
    /// [`Topology::polygonize`].
    pub fn add_line_no_face(
        &mut self,
        line: &LineString<f64>,
        tol: f64,
    ) -> TopoResult<Vec<ElemId>> {
        self.add_line_impl(line, tol, false)
    }

    fn add_line_impl(
        &mut self,
        line: &LineString<f64>,
        tol: f64,
        handle_face_split: bool,
    ) -> TopoResult<Vec<ElemId>> {
        if line.0.len() < 2 {
            return Ok(Vec::new());
        }
        let bbox = edge_mbr(line)?;
        let tol = self.tolerance_for(tol, Some(&bbox));
        debug!("adding line with tolerance {}", tol);

        let clean = kernel::remove_repeated_points(line, tol);
        let mut pieces = linework::self_node(&clean);

        // Candidate existing linework within tolerance of the input.
        let qbox = kernel::expand_rect(&bbox, tol);
        let boxed =
            self.store
                .get_edge_within_box(Some(&qbox), columns::edge::ALL, Limit::All)?;
        let mut nearby_edges = Vec::new();
        for e in boxed {
            self.check_cancel()?;
            if kernel::line_line_distance(&e.geom, &clean) < tol {
                nearby_edges.push(e);
            }
        }
        let boxed =
            self.store
                .get_node_within_box(Some(&qbox), columns::node::ALL, Limit::All)?;
        let mut nearby_nodes = Vec::new();
        for n in boxed {
            if !n.is_isolated() {
                continue;
            }
            if kernel::point_line_distance(&clean, n.geom.0) < tol {
                nearby_nodes.push(n);
            }
        }
        debug!(
            "{} edges and {} isolated nodes within tolerance",
            nearby_edges.len(),
            nearby_nodes.len()
        );

        // Snap to everything nearby, then re-node: snapping can introduce
        // self-contacts of its own.
        if !nearby_edges.is_empty() || !nearby_nodes.is_empty() {
            let mut targets: Vec<Coord<f64>> = nearby_nodes.iter().map(|n| n.geom.0).collect();
            for e in &nearby_edges {
                targets.extend_from_slice(&e.geom.0);
            }
            let snapped: Vec<LineString<f64>> = pieces
                .iter()
                .map(|p| linework::snap_line(p, &targets, tol))
                .filter(|p| p.0.len() >= 2)
                .collect();
            pieces = linework::node_together(&snapped);
        }

        // Cut at every contact with existing edges, so each piece either
        // coincides with (part of) an edge or stays clear of them, and at
        // every pre-existing node position.
        if !nearby_edges.is_empty() {
            let obstacles: Vec<LineString<f64>> =
                nearby_edges.iter().map(|e| e.geom.clone()).collect();
            pieces = pieces
                .iter()
                .flat_map(|p| linework::split_at_obstacles(p, &obstacles))
                .collect();
        }
        let mut cut_points: Vec<Coord<f64>> = nearby_nodes.iter().map(|n| n.geom.0).collect();
        for e in &nearby_edges {
            cut_points.push(e.geom.0[0]);
            cut_points.push(e.geom.0[e.geom.0.len() - 1]);
        }
        if !cut_points.is_empty() {
            pieces = pieces
                .iter()
                .flat_map(|p| linework::split_at_points(p, &cut_points))
                .collect();
        }

        let mut ids = Vec::new();
        for piece in pieces {
            self.check_cancel()?;
            if let Some((id, forward)) = self.add_line_edge(piece, tol, handle_face_split)? {
                ids.push(if forward { id } else { -id });
            }
        }
        Ok(ids)
    }

    /// Register one pre-noded, pre-split piece as an edge, reusing an
    /// equal existing edge when there is one. `None` when the piece
    /// collapsed away.
    fn add_line_edge(
        &mut self,
        mut piece: LineString<f64>,
        tol: f64,
        handle_face_split: bool,
    ) -> TopoResult<Option<(ElemId, bool)>> {
        if piece.0.len() < 2 {
            return Ok(None);
        }

        let start = Point::from(piece.0[0]);
        let end = Point::from(piece.0[piece.0.len() - 1]);
        let (nid0, moved0) = self.add_point_impl(
            &start,
            kernel::min_tolerance(Some(&point_rect(&start))),
            handle_face_split,
        )?;
        let (nid1, moved1) = self.add_point_impl(
            &end,
            kernel::min_tolerance(Some(&point_rect(&end))),
            handle_face_split,
        )?;
        debug!(
            "piece endpoints are nodes {} and {} (moved: {})",
            nid0,
            nid1,
            moved0 || moved1
        );

        if moved0 || moved1 {
            // Endpoints drifted in the snap: re-anchor the piece on the
            // final node positions.
            let rows = self
                .store
                .get_node_by_id(&[nid0, nid1], columns::node::NODE_ID | columns::node::GEOM)?;
            let sp = rows
                .iter()
                .find(|n| n.node_id == nid0)
                .ok_or(TopologyError::NonExistentNode(nid0))?
                .geom;
            let ep = rows
                .iter()
                .find(|n| n.node_id == nid1)
                .ok_or(TopologyError::NonExistentNode(nid1))?
                .geom;
            piece.0[0] = sp.0;
            let last = piece.0.len() - 1;
            piece.0[last] = ep.0;
            piece = kernel::remove_repeated_points(&piece, 0.0);
            if piece.0.len() < 2 || (piece.0.len() == 2 && piece.0[0] == piece.0[1]) {
                return Ok(None);
            }
        }

        if let Some(found) = self.get_equal_edge(&piece)? {
            return Ok(Some(found));
        }

        if tol != 0.0 {
            piece = kernel::remove_repeated_points(&piece, tol);
            if nid0 == nid1 && piece.0.len() == 2 {
                return Ok(None);
            }
            if let Some(found) = self.get_equal_edge(&piece)? {
                return Ok(Some(found));
            }
        }

        let mode = if handle_face_split {
            FaceHandling::ModFace
        } else {
            FaceHandling::NoFaceCheck
        };
        let id = self.add_edge(nid0, nid1, piece, false, mode)?;
        Ok(Some((id, true)))
    }

    /// An existing edge with the same support as `line`, and whether it
    /// runs in the same direction.
    fn get_equal_edge(&self, line: &LineString<f64>) -> TopoResult<Option<(ElemId, bool)>> {
        let bbox = edge_mbr(line)?;
        let rows = self.store.get_edge_within_box(
            Some(&bbox),
            columns::edge::EDGE_ID | columns::edge::GEOM,
            Limit::All,
        )?;
        for e in &rows {
            if let Some(forward) = kernel::lines_equal(line, &e.geom) {
                return Ok(Some((e.edge_id, forward)));
            }
        }
        Ok(None)
    }

    /// Integrate a polygon within tolerance: its rings are added as lines,
    /// then every face whose interior the polygon covers belongs to its
    /// decomposition. Returns the covered face ids.
    pub fn add_polygon(&mut self, poly: &Polygon<f64>, tol: f64) -> TopoResult<Vec<ElemId>> {
        if poly.exterior().0.is_empty() {
            return Ok(Vec::new());
        }
        let bbox = poly.bounding_rect().ok_or(TopologyError::InvalidGeometry(
            "empty polygon",
        ))?;
        let tol = self.tolerance_for(tol, Some(&bbox));

        self.load_polygon(poly, tol)?;

        // Note: snapping may have moved ring edges; the box stays grown
        // by the tolerance to keep candidate faces in view.
        let qbox = kernel::expand_rect(&bbox, tol);
        let faces = self
            .store
            .get_face_within_box(Some(&qbox), columns::face::ALL, Limit::All)?;
        let mut covered = Vec::new();
        for f in &faces {
            self.check_cancel()?;
            let fg = self.face_geometry(f.face_id)?;
            let probe = fg.interior_point().ok_or_else(|| {
                TopologyError::CorruptedTopology(format!(
                    "face {} has a degenerate geometry",
                    f.face_id
                ))
            })?;
            if polygon_covers(poly, probe.0) {
                covered.push(f.face_id);
            }
        }
        Ok(covered)
    }

    /// Load a point, discarding the resulting node id.
    pub fn load_point(&mut self, pt: &Point<f64>, tol: f64) -> TopoResult<()> {
        self.add_point(pt, tol).map(|_| ())
    }

    /// Load a line, discarding the resulting edge ids.
    pub fn load_line(&mut self, line: &LineString<f64>, tol: f64) -> TopoResult<()> {
        self.add_line(line, tol).map(|_| ())
    }

    /// Load every ring of a polygon as a line.
    pub fn load_polygon(&mut self, poly: &Polygon<f64>, tol: f64) -> TopoResult<()> {
        self.load_line(poly.exterior(), tol)?;
        for ring in poly.interiors() {
            self.load_line(ring, tol)?;
        }
        Ok(())
    }

    /// Load any geometry, recursing over collections.
    pub fn load_geometry(&mut self, geom: &Geometry<f64>, tol: f64) -> TopoResult<()> {
        match geom {
            Geometry::Point(p) => self.load_point(p, tol),
            Geometry::Line(l) => self.load_line(&LineString::from(*l), tol),
            Geometry::LineString(l) => self.load_line(l, tol),
            Geometry::Polygon(p) => self.load_polygon(p, tol),
            Geometry::Rect(r) => self.load_polygon(&r.to_polygon(), tol),
            Geometry::Triangle(t) => self.load_polygon(&t.to_polygon(), tol),
            Geometry::MultiPoint(ps) => {
                for p in &ps.0 {
                    self.load_point(p, tol)?;
                }
                Ok(())
            }
            Geometry::MultiLineString(ls) => {
                for l in &ls.0 {
                    self.load_line(l, tol)?;
                }
                Ok(())
            }
            Geometry::MultiPolygon(ps) => {
                for p in &ps.0 {
                    self.load_polygon(p, tol)?;
                }
                Ok(())
            }
            Geometry::GeometryCollection(gc) => {
                for g in &gc.0 {
                    self.load_geometry(g, tol)?;
                }
                Ok(())
            }
        }
    }
}
