//! Noding and snapping helpers for the tolerance population layer.
//!
//! These operate on raw linestrings, before anything touches storage: a
//! line is decomposed into simple chains cut at every self-intersection,
//! contact point with existing linework, and pre-existing node position.
//! Intersection points come from the robust segment intersector.

use geo::line_intersection::{line_intersection, LineIntersection};
use geo_types::{Coord, Line, LineString};

use crate::kernel;

/// Collect the points where `seg` meets any of the other segments.
fn segment_cuts(seg: Line<f64>, others: &[Line<f64>], cuts: &mut Vec<Coord<f64>>) {
    for &other in others {
        match line_intersection(seg, other) {
            None => {}
            Some(LineIntersection::SinglePoint { intersection, .. }) => {
                cuts.push(intersection);
            }
            Some(LineIntersection::Collinear { intersection }) => {
                cuts.push(intersection.start);
                cuts.push(intersection.end);
            }
        }
    }
}

/// Split one segment at the given points (ignoring points not on it),
/// emitting the ordered subsegments.
fn split_segment(seg: Line<f64>, cuts: &[Coord<f64>], out: &mut Vec<Line<f64>>) {
    let mut stops: Vec<(f64, Coord<f64>)> = vec![(0.0, seg.start), (1.0, seg.end)];
    let len2 = (seg.end.x - seg.start.x).powi(2) + (seg.end.y - seg.start.y).powi(2);
    for &c in cuts {
        if c == seg.start || c == seg.end || !kernel::point_on_segment(seg.start, seg.end, c) {
            continue;
        }
        let t = ((c.x - seg.start.x) * (seg.end.x - seg.start.x)
            + (c.y - seg.start.y) * (seg.end.y - seg.start.y))
            / len2;
        stops.push((t, c));
    }
    stops.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    for w in stops.windows(2) {
        if w[0].1 != w[1].1 {
            out.push(Line::new(w[0].1, w[1].1));
        }
    }
}

/// Stitch undirected segments into maximal chains, breaking at junction
/// points (where the number of incident segment ends differs from two).
/// Pure cycles are anchored at `anchor` when it is one of their vertices.
fn stitch_chains(segments: Vec<Line<f64>>, anchor: Coord<f64>) -> Vec<LineString<f64>> {
    // Undirected dedup: a segment walked twice collapses to one.
    let mut segs: Vec<Line<f64>> = Vec::new();
    for s in segments {
        let dup = segs
            .iter()
            .any(|t| (t.start == s.start && t.end == s.end) || (t.start == s.end && t.end == s.start));
        if !dup {
            segs.push(s);
        }
    }

    let mut degree: Vec<(Coord<f64>, usize)> = Vec::new();
    let bump = |c: Coord<f64>, degree: &mut Vec<(Coord<f64>, usize)>| {
        if let Some(e) = degree.iter_mut().find(|(p, _)| *p == c) {
            e.1 += 1;
        } else {
            degree.push((c, 1));
        }
    };
    for s in &segs {
        bump(s.start, &mut degree);
        bump(s.end, &mut degree);
    }
    let degree_of =
        |c: Coord<f64>, degree: &[(Coord<f64>, usize)]| degree.iter().find(|(p, _)| *p == c).map_or(0, |(_, d)| *d);

    let mut used = vec![false; segs.len()];
    let mut chains: Vec<LineString<f64>> = Vec::new();

    // Extend a chain from `from` while the path is unambiguous.
    let walk = |start_seg: usize,
                flip: bool,
                used: &mut Vec<bool>,
                degree: &[(Coord<f64>, usize)]|
     -> Vec<Coord<f64>> {
        let s = segs[start_seg];
        let (a, b) = if flip { (s.end, s.start) } else { (s.start, s.end) };
        let mut pts = vec![a, b];
        used[start_seg] = true;
        let mut cur = b;
        loop {
            if degree_of(cur, degree) != 2 {
                break;
            }
            let next = segs.iter().enumerate().find(|(i, t)| {
                !used[*i] && (t.start == cur || t.end == cur)
            });
            match next {
                None => break,
                Some((i, t)) => {
                    used[i] = true;
                    cur = if t.start == cur { t.end } else { t.start };
                    pts.push(cur);
                }
            }
        }
        pts
    };

    // Chains starting at junctions or loose ends first.
    for i in 0..segs.len() {
        if used[i] {
            continue;
        }
        let s = segs[i];
        if degree_of(s.start, &degree) != 2 {
            chains.push(LineString::from(walk(i, false, &mut used, &degree)));
        } else if degree_of(s.end, &degree) != 2 {
            chains.push(LineString::from(walk(i, true, &mut used, &degree)));
        }
    }
    // Whatever remains is made of pure cycles.
    for i in 0..segs.len() {
        if used[i] {
            continue;
        }
        let at_anchor = segs
            .iter()
            .enumerate()
            .find(|(j, t)| !used[*j] && (t.start == anchor || t.end == anchor));
        let (j, flip) = match at_anchor {
            Some((j, t)) => (j, t.start != anchor),
            None => (i, false),
        };
        chains.push(LineString::from(walk(j, flip, &mut used, &degree)));
    }

    chains
}

/// Decompose a line into simple chains, cutting at self-intersections.
pub(crate) fn self_node(line: &LineString<f64>) -> Vec<LineString<f64>> {
    node_together(std::slice::from_ref(line))
}

/// Node a set of chains against themselves and each other (snapping may
/// have introduced new contacts).
pub(crate) fn node_together(chains: &[LineString<f64>]) -> Vec<LineString<f64>> {
    let anchor = match chains.first().and_then(|c| c.0.first()) {
        Some(&c) => c,
        None => return Vec::new(),
    };
    let segs: Vec<Line<f64>> = chains
        .iter()
        .flat_map(|c| c.lines())
        .filter(|s| s.start != s.end)
        .collect();
    if segs.is_empty() {
        return Vec::new();
    }
    let mut pieces = Vec::new();
    for (i, &seg) in segs.iter().enumerate() {
        let others: Vec<Line<f64>> = segs
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, &s)| s)
            .collect();
        let mut cuts = Vec::new();
        segment_cuts(seg, &others, &mut cuts);
        split_segment(seg, &cuts, &mut pieces);
    }
    stitch_chains(pieces, anchor)
}

/// Split a chain wherever it starts or stops touching the obstacle
/// lines, so that every returned piece either runs along obstacle
/// linework for its whole length or keeps clear of it between its
/// endpoints. Contact points interior to a contact run do not cut (the
/// run stays in one piece, the way a merged intersection set would).
pub(crate) fn split_at_obstacles(
    chain: &LineString<f64>,
    obstacles: &[LineString<f64>],
) -> Vec<LineString<f64>> {
    let obstacle_segs: Vec<Line<f64>> = obstacles
        .iter()
        .flat_map(|o| o.lines())
        .filter(|s| s.start != s.end)
        .collect();

    // Contact intervals in chain arc coordinates (segment index plus
    // fraction along the segment), with the exact contact coordinates.
    let arc = |seg: Line<f64>, base: f64, c: Coord<f64>| {
        let len2 = (seg.end.x - seg.start.x).powi(2) + (seg.end.y - seg.start.y).powi(2);
        let t = ((c.x - seg.start.x) * (seg.end.x - seg.start.x)
            + (c.y - seg.start.y) * (seg.end.y - seg.start.y))
            / len2;
        base + t.clamp(0.0, 1.0)
    };
    let mut intervals: Vec<(f64, Coord<f64>, f64, Coord<f64>)> = Vec::new();
    for (i, seg) in chain.lines().filter(|s| s.start != s.end).enumerate() {
        let base = i as f64;
        for &o in &obstacle_segs {
            match line_intersection(seg, o) {
                None => {}
                Some(LineIntersection::SinglePoint { intersection: p, .. }) => {
                    let s = arc(seg, base, p);
                    intervals.push((s, p, s, p));
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    let s0 = arc(seg, base, intersection.start);
                    let s1 = arc(seg, base, intersection.end);
                    if s0 <= s1 {
                        intervals.push((s0, intersection.start, s1, intersection.end));
                    } else {
                        intervals.push((s1, intersection.end, s0, intersection.start));
                    }
                }
            }
        }
    }
    if intervals.is_empty() {
        return vec![chain.clone()];
    }

    intervals.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    let mut merged: Vec<(f64, Coord<f64>, f64, Coord<f64>)> = Vec::new();
    for iv in intervals {
        match merged.last_mut() {
            Some(last) if iv.0 <= last.2 => {
                if iv.2 > last.2 {
                    last.2 = iv.2;
                    last.3 = iv.3;
                }
            }
            _ => merged.push(iv),
        }
    }

    let mut cut_points = Vec::new();
    for (_, c0, _, c1) in merged {
        cut_points.push(c0);
        cut_points.push(c1);
    }
    split_at_points(chain, &cut_points)
}

/// Split a chain at every given point lying on it (endpoints excepted).
pub(crate) fn split_at_points(
    chain: &LineString<f64>,
    points: &[Coord<f64>],
) -> Vec<LineString<f64>> {
    let mut out = Vec::new();
    let mut current: Vec<Coord<f64>> = Vec::new();
    for seg in chain.lines() {
        if seg.start == seg.end {
            continue;
        }
        let mut pieces = Vec::new();
        split_segment(seg, points, &mut pieces);
        for piece in pieces {
            if current.is_empty() {
                current.push(piece.start);
            }
            current.push(piece.end);
            // Reaching a cut point seals the running piece.
            if points.contains(&piece.end) {
                out.push(LineString::from(std::mem::take(&mut current)));
            }
        }
    }
    if current.len() > 1 {
        out.push(LineString::from(current));
    }
    out
}

/// Snap a line onto target vertices: vertices within `tol` of a target
/// move onto it, and targets within `tol` of a segment are woven into it.
pub(crate) fn snap_line(
    line: &LineString<f64>,
    targets: &[Coord<f64>],
    tol: f64,
) -> LineString<f64> {
    let dist = |a: Coord<f64>, b: Coord<f64>| ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();

    // Move vertices onto their closest target.
    let mut pts: Vec<Coord<f64>> = line
        .0
        .iter()
        .map(|&v| {
            let mut best: Option<(f64, Coord<f64>)> = None;
            for &t in targets {
                let d = dist(v, t);
                if d < tol && best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, t));
                }
            }
            best.map_or(v, |(_, t)| t)
        })
        .collect();
    pts.dedup();

    // Weave remaining targets into segments passing nearby.
    let mut i = 0;
    while i + 1 < pts.len() {
        let a = pts[i];
        let b = pts[i + 1];
        let mut woven: Option<(f64, Coord<f64>)> = None;
        for &t in targets {
            if t == a || t == b {
                continue;
            }
            let d = kernel::point_segment_distance(a, b, t);
            if d >= tol {
                continue;
            }
            let along = dist(a, t);
            if woven.map_or(true, |(w, _)| along < w) {
                woven = Some((along, t));
            }
        }
        match woven {
            Some((_, t)) if !pts.contains(&t) => pts.insert(i + 1, t),
            _ => i += 1,
        }
    }
    pts.dedup();
    LineString::from(pts)
}
