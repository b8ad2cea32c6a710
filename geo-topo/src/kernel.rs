//! Pure 2D predicates and point-array helpers used across the engine.
//!
//! Everything here is deterministic and storage-free. Orientation tests go
//! through the adaptive-precision `robust` predicates, the same way `geo`'s
//! `RobustKernel` does; tie-sensitive callers (edge fans, face resolution)
//! rely on that determinism.

use std::f64::consts::PI;

use geo_types::{Coord, LineString, Rect};

/// Direction of the ray p→q, in `[0, 2π)`, measured clockwise from north.
///
/// Only azimuth *differences* are ever compared by the engine; the clockwise
/// sense makes "smaller positive difference" mean "met earlier when rotating
/// clockwise", which the edge linking machinery depends on.
///
/// Returns `None` when the two points coincide.
pub fn azimuth(p: Coord<f64>, q: Coord<f64>) -> Option<f64> {
    if p == q {
        return None;
    }
    let az = (q.x - p.x).atan2(q.y - p.y);
    Some(if az < 0.0 { az + 2.0 * PI } else { az })
}

/// Angular difference `az − from`, normalized to `[0, 2π)`.
pub fn azimuth_diff(az: f64, from: f64) -> f64 {
    let d = az - from;
    if d < 0.0 {
        d + 2.0 * PI
    } else {
        d
    }
}

/// Position of a point relative to a directed segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentSide {
    Left,
    On,
    Right,
}

/// Side of the directed segment a→b the point p falls on.
pub fn segment_side(a: Coord<f64>, b: Coord<f64>, p: Coord<f64>) -> SegmentSide {
    use robust::{orient2d, Coord as RCoord};
    let orientation = orient2d(
        RCoord { x: a.x, y: a.y },
        RCoord { x: b.x, y: b.y },
        RCoord { x: p.x, y: p.y },
    );
    if orientation > 0.0 {
        SegmentSide::Left
    } else if orientation < 0.0 {
        SegmentSide::Right
    } else {
        SegmentSide::On
    }
}

/// Position of a point relative to a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingPosition {
    Inside,
    Outside,
    Boundary,
}

/// Crossing-number containment test against a point array treated as a
/// closed ring (a virtual closing segment is walked if the array is open).
pub fn point_in_ring(ring: &LineString<f64>, p: Coord<f64>) -> RingPosition {
    let pts = &ring.0;
    if pts.len() < 2 {
        return RingPosition::Outside;
    }
    let closed = pts.first() == pts.last();
    let n = if closed { pts.len() - 1 } else { pts.len() };
    let mut crossings = 0u32;
    for i in 0..n {
        let v1 = pts[i];
        let v2 = pts[(i + 1) % n];
        if point_on_segment(v1, v2, p) {
            return RingPosition::Boundary;
        }
        if (v1.y <= p.y && v2.y > p.y) || (v1.y > p.y && v2.y <= p.y) {
            let vt = (p.y - v1.y) / (v2.y - v1.y);
            if p.x < v1.x + vt * (v2.x - v1.x) {
                crossings += 1;
            }
        }
    }
    if crossings % 2 == 1 {
        RingPosition::Inside
    } else {
        RingPosition::Outside
    }
}

/// True when p lies on the closed segment [a, b], endpoints included.
pub fn point_on_segment(a: Coord<f64>, b: Coord<f64>, p: Coord<f64>) -> bool {
    if segment_side(a, b, p) != SegmentSide::On {
        return false;
    }
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// True when p lies somewhere on the polyline path, vertices included.
pub fn point_on_line(line: &LineString<f64>, p: Coord<f64>) -> bool {
    line.lines().any(|s| point_on_segment(s.start, s.end, p))
}

/// First vertex, scanning from index `from` in direction `dir` (`+1`/`−1`),
/// that differs from `reference`. `None` when the scan runs off the array
/// without finding one (the line is collapsed).
pub fn first_distinct_vertex(
    line: &LineString<f64>,
    reference: Coord<f64>,
    from: usize,
    dir: i32,
) -> Option<Coord<f64>> {
    let pts = &line.0;
    let mut i = from as i64 + dir as i64;
    while i >= 0 && (i as usize) < pts.len() {
        let c = pts[i as usize];
        if c != reference {
            return Some(c);
        }
        i += dir as i64;
    }
    None
}

/// A point interior to the line: the first vertex distinct from both
/// endpoints, or the segment midpoint for two-point lines. `None` for
/// collapsed lines.
pub fn interior_line_point(line: &LineString<f64>) -> Option<Coord<f64>> {
    let pts = &line.0;
    if pts.len() < 2 {
        return None;
    }
    let fp = pts[0];
    let lp = pts[pts.len() - 1];
    for &c in &pts[1..pts.len() - 1] {
        if c != fp && c != lp {
            return Some(c);
        }
    }
    if fp == lp {
        return None;
    }
    Some(Coord {
        x: fp.x + (lp.x - fp.x) * 0.5,
        y: fp.y + (lp.y - fp.y) * 0.5,
    })
}

/// Euclidean distance between two coordinates.
pub fn point_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

fn dist(a: Coord<f64>, b: Coord<f64>) -> f64 {
    point_distance(a, b)
}

/// Fraction along [a, b] of the projection of p, clamped to `[0, 1]`.
fn project_fraction(a: Coord<f64>, b: Coord<f64>, p: Coord<f64>) -> f64 {
    let len2 = (b.x - a.x).powi(2) + (b.y - a.y).powi(2);
    if len2 == 0.0 {
        return 0.0;
    }
    let r = ((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / len2;
    r.clamp(0.0, 1.0)
}

/// Distance from p to the closed segment [a, b].
pub fn point_segment_distance(a: Coord<f64>, b: Coord<f64>, p: Coord<f64>) -> f64 {
    let r = project_fraction(a, b, p);
    dist(
        Coord {
            x: a.x + r * (b.x - a.x),
            y: a.y + r * (b.y - a.y),
        },
        p,
    )
}

/// Minimum distance from p to the polyline.
pub fn point_line_distance(line: &LineString<f64>, p: Coord<f64>) -> f64 {
    line.lines()
        .map(|s| point_segment_distance(s.start, s.end, p))
        .fold(f64::INFINITY, f64::min)
}

fn segments_intersect(a0: Coord<f64>, a1: Coord<f64>, b0: Coord<f64>, b1: Coord<f64>) -> bool {
    use SegmentSide::*;
    let s1 = segment_side(a0, a1, b0);
    let s2 = segment_side(a0, a1, b1);
    let s3 = segment_side(b0, b1, a0);
    let s4 = segment_side(b0, b1, a1);
    if s1 != s2 && s3 != s4 && s1 != On && s3 != On {
        return true;
    }
    (s1 == On && point_on_segment(a0, a1, b0))
        || (s2 == On && point_on_segment(a0, a1, b1))
        || (s3 == On && point_on_segment(b0, b1, a0))
        || (s4 == On && point_on_segment(b0, b1, a1))
}

fn segment_segment_distance(
    a0: Coord<f64>,
    a1: Coord<f64>,
    b0: Coord<f64>,
    b1: Coord<f64>,
) -> f64 {
    if segments_intersect(a0, a1, b0, b1) {
        return 0.0;
    }
    point_segment_distance(a0, a1, b0)
        .min(point_segment_distance(a0, a1, b1))
        .min(point_segment_distance(b0, b1, a0))
        .min(point_segment_distance(b0, b1, a1))
}

/// Minimum distance between two polylines, zero when they intersect.
pub fn line_line_distance(a: &LineString<f64>, b: &LineString<f64>) -> f64 {
    let mut best = f64::INFINITY;
    for sa in a.lines() {
        for sb in b.lines() {
            best = best.min(segment_segment_distance(sa.start, sa.end, sb.start, sb.end));
            if best == 0.0 {
                return 0.0;
            }
        }
    }
    best
}

/// Closest point of a polyline to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestOnLine {
    /// The closest point itself.
    pub point: Coord<f64>,
    /// Index of the segment (0-based over `line.lines()`) it falls on.
    pub segment: usize,
    /// Projection fraction along that segment, in `[0, 1]`.
    pub fraction: f64,
    pub distance: f64,
}

/// Project p onto the polyline, keeping which segment won. Ties resolve to
/// the earliest segment, so repeated queries are stable.
pub fn closest_point_on_line(line: &LineString<f64>, p: Coord<f64>) -> Option<ClosestOnLine> {
    let mut best: Option<ClosestOnLine> = None;
    for (i, s) in line.lines().enumerate() {
        let r = project_fraction(s.start, s.end, p);
        let c = Coord {
            x: s.start.x + r * (s.end.x - s.start.x),
            y: s.start.y + r * (s.end.y - s.start.y),
        };
        let d = dist(c, p);
        if best.map_or(true, |b| d < b.distance) {
            best = Some(ClosestOnLine {
                point: c,
                segment: i,
                fraction: r,
                distance: d,
            });
        }
    }
    best
}

/// Split a line at a point lying on it. The point becomes the final vertex
/// of the first half and the leading vertex of the second. `None` when the
/// point is an endpoint of the line or does not lie on it at all.
pub fn split_line_at_point(
    line: &LineString<f64>,
    p: Coord<f64>,
) -> Option<(LineString<f64>, LineString<f64>)> {
    let pts = &line.0;
    if pts.len() < 2 || p == pts[0] || p == pts[pts.len() - 1] {
        return None;
    }
    for (j, &v) in pts.iter().enumerate().take(pts.len() - 1).skip(1) {
        if v == p {
            return Some((
                LineString::from(pts[..=j].to_vec()),
                LineString::from(pts[j..].to_vec()),
            ));
        }
    }
    for (i, s) in line.lines().enumerate() {
        if point_on_segment(s.start, s.end, p) {
            let mut first = pts[..=i].to_vec();
            first.push(p);
            let mut second = vec![p];
            second.extend_from_slice(&pts[i + 1..]);
            return Some((LineString::from(first), LineString::from(second)));
        }
    }
    None
}

/// Drop consecutive vertices equal to their predecessor (first and last
/// vertices always survive). With a non-zero tolerance, also drop vertices
/// closer than `tol` to the previously kept one.
pub fn remove_repeated_points(line: &LineString<f64>, tol: f64) -> LineString<f64> {
    let pts = &line.0;
    if pts.len() < 3 {
        return line.clone();
    }
    let mut out = vec![pts[0]];
    for &c in &pts[1..pts.len() - 1] {
        let last = *out.last().unwrap();
        if c == last || (tol > 0.0 && dist(c, last) < tol) {
            continue;
        }
        out.push(c);
    }
    out.push(pts[pts.len() - 1]);
    LineString::from(out)
}

/// Do two lines have the same support? `Some(true)` when their cleaned
/// vertex sequences match in the same direction, `Some(false)` when they
/// match reversed, `None` otherwise.
pub fn lines_equal(a: &LineString<f64>, b: &LineString<f64>) -> Option<bool> {
    let na = remove_repeated_points(a, 0.0).0;
    let nb = remove_repeated_points(b, 0.0).0;
    if na.len() != nb.len() {
        return None;
    }
    if na == nb {
        return Some(true);
    }
    if na.iter().rev().eq(nb.iter()) {
        return Some(false);
    }
    None
}

/// Simplicity test for a polyline: no interior self-intersection.
///
/// Consecutive segments may share only their common vertex; non-adjacent
/// segments may not meet at all, except the first and last segment of a
/// closed line, which share exactly the closure point.
pub fn is_simple_line(line: &LineString<f64>) -> bool {
    let clean = remove_repeated_points(line, 0.0);
    let pts = &clean.0;
    if pts.len() < 2 {
        return false;
    }
    let closed = pts[0] == pts[pts.len() - 1];
    let segs: Vec<geo_types::Line<f64>> = clean.lines().collect();
    let n = segs.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let a = segs[i];
            let b = segs[j];
            let shared = if j == i + 1 {
                Some(a.end)
            } else if closed && i == 0 && j == n - 1 {
                Some(a.start)
            } else {
                None
            };
            match shared {
                Some(p) => {
                    // Segments sharing one endpoint may meet only there.
                    // Two straight segments with a common point meet
                    // anywhere else only when collinear, which an
                    // endpoint-on-the-other test detects.
                    for q in [b.start, b.end] {
                        if q != p && point_on_segment(a.start, a.end, q) {
                            return false;
                        }
                    }
                    for q in [a.start, a.end] {
                        if q != p && point_on_segment(b.start, b.end, q) {
                            return false;
                        }
                    }
                }
                None => {
                    if segments_intersect(a.start, a.end, b.start, b.end) {
                        return false;
                    }
                }
            }
        }
    }
    true
}

/// Rect grown by `d` on every side.
pub fn expand_rect(r: &Rect<f64>, d: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: r.min().x - d,
            y: r.min().y - d,
        },
        Coord {
            x: r.max().x + d,
            y: r.max().y + d,
        },
    )
}

/// Smallest rect covering both inputs.
pub fn rect_union(a: &Rect<f64>, b: &Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

/// Inclusive point-in-rect test.
pub fn rect_contains(r: &Rect<f64>, p: Coord<f64>) -> bool {
    p.x >= r.min().x && p.x <= r.max().x && p.y >= r.min().y && p.y <= r.max().y
}

/// The smallest delta able to perturb the largest absolute ordinate of the
/// given bounds. Used to derive a working tolerance when the caller passes
/// zero and the topology carries no precision.
pub fn min_tolerance(bounds: Option<&Rect<f64>>) -> f64 {
    let max = match bounds {
        None => return 0.0,
        Some(r) => r
            .min()
            .x
            .abs()
            .max(r.max().x.abs())
            .max(r.min().y.abs())
            .max(r.max().y.abs()),
    };
    let max = if max == 0.0 { 1.0 } else { max };
    3.6 * 10f64.powf(-(15.0 - max.log10()))
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::line_string;

    const C: fn(f64, f64) -> Coord<f64> = |x, y| Coord { x, y };

    #[test]
    fn azimuth_quadrants() {
        let o = C(0.0, 0.0);
        assert_relative_eq!(azimuth(o, C(0.0, 1.0)).unwrap(), 0.0);
        assert_relative_eq!(azimuth(o, C(1.0, 0.0)).unwrap(), PI / 2.0);
        assert_relative_eq!(azimuth(o, C(0.0, -1.0)).unwrap(), PI);
        assert_relative_eq!(azimuth(o, C(-1.0, 0.0)).unwrap(), 1.5 * PI);
        assert!(azimuth(o, o).is_none());
    }

    #[test]
    fn azimuth_diff_wraps() {
        assert_relative_eq!(azimuth_diff(0.5, 0.25), 0.25);
        assert_relative_eq!(azimuth_diff(0.25, 0.5), 2.0 * PI - 0.25);
    }

    #[test]
    fn side_of_segment() {
        let a = C(0.0, 0.0);
        let b = C(10.0, 0.0);
        assert_eq!(segment_side(a, b, C(5.0, 1.0)), SegmentSide::Left);
        assert_eq!(segment_side(a, b, C(5.0, -1.0)), SegmentSide::Right);
        assert_eq!(segment_side(a, b, C(5.0, 0.0)), SegmentSide::On);
    }

    #[test]
    fn ring_containment() {
        let ring = line_string![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0)
        ];
        assert_eq!(point_in_ring(&ring, C(5.0, 5.0)), RingPosition::Inside);
        assert_eq!(point_in_ring(&ring, C(15.0, 5.0)), RingPosition::Outside);
        assert_eq!(point_in_ring(&ring, C(10.0, 5.0)), RingPosition::Boundary);
        assert_eq!(point_in_ring(&ring, C(0.0, 0.0)), RingPosition::Boundary);
    }

    #[test]
    fn open_ring_is_virtually_closed() {
        let open = line_string![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0)
        ];
        assert_eq!(point_in_ring(&open, C(5.0, 5.0)), RingPosition::Inside);
        assert_eq!(point_in_ring(&open, C(-1.0, 5.0)), RingPosition::Outside);
    }

    #[test]
    fn distinct_vertex_scan() {
        let line = line_string![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 9.0, y: 0.0)
        ];
        assert_eq!(
            first_distinct_vertex(&line, C(0.0, 0.0), 0, 1),
            Some(C(4.0, 0.0))
        );
        assert_eq!(
            first_distinct_vertex(&line, C(9.0, 0.0), 3, -1),
            Some(C(4.0, 0.0))
        );
        let collapsed = line_string![(x: 1.0, y: 1.0), (x: 1.0, y: 1.0)];
        assert_eq!(first_distinct_vertex(&collapsed, C(1.0, 1.0), 0, 1), None);
    }

    #[test]
    fn split_at_interior_point() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        let (a, b) = split_line_at_point(&line, C(4.0, 0.0)).unwrap();
        assert_eq!(a, line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0)]);
        assert_eq!(b, line_string![(x: 4.0, y: 0.0), (x: 10.0, y: 0.0)]);
        assert!(split_line_at_point(&line, C(0.0, 0.0)).is_none());
        assert!(split_line_at_point(&line, C(4.0, 1.0)).is_none());
    }

    #[test]
    fn split_at_existing_vertex() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 10.0, y: 0.0)];
        let (a, b) = split_line_at_point(&line, C(4.0, 0.0)).unwrap();
        assert_eq!(a.0.len(), 2);
        assert_eq!(b.0.len(), 2);
    }

    #[test]
    fn line_support_equality() {
        let a = line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 5.0), (x: 10.0, y: 0.0)];
        let fwd = a.clone();
        let mut rev = a.clone();
        rev.0.reverse();
        assert_eq!(lines_equal(&a, &fwd), Some(true));
        assert_eq!(lines_equal(&a, &rev), Some(false));
        let other = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        assert_eq!(lines_equal(&a, &other), None);
    }

    #[test]
    fn simplicity() {
        let open = line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 5.0, y: 5.0)];
        assert!(is_simple_line(&open));
        let crossing = line_string![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 5.0, y: 5.0),
            (x: 5.0, y: -5.0)
        ];
        assert!(!is_simple_line(&crossing));
        let ring = line_string![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 0.0)
        ];
        assert!(is_simple_line(&ring));
        let foldback = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 5.0, y: 0.0)];
        assert!(!is_simple_line(&foldback));
        let collapsed_ring = line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 5.0), (x: 0.0, y: 0.0)];
        assert!(!is_simple_line(&collapsed_ring));
    }

    #[test]
    fn tolerance_scales_with_ordinates() {
        let r = Rect::new(C(0.0, 0.0), C(1_000_000.0, 10.0));
        let t = min_tolerance(Some(&r));
        assert!(t > 0.0 && t < 1e-6);
    }
}
