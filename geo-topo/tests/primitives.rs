//! Scenario tests for the primitive operators.

use geo_topo::storage::{Event, MemTopology};
use geo_topo::{ElemId, Topology, TopologyError, NULL_ID, UNIVERSE_FACE};
use geo_types::{line_string, point, Coord};

fn empty_topo() -> Topology<MemTopology> {
    Topology::new(MemTopology::new())
}

/// Nodes n1..n4 at the corners of a 10x10 square, all isolated in the
/// universe face.
fn square_corners(topo: &mut Topology<MemTopology>) -> [ElemId; 4] {
    let n1 = topo.add_iso_node(NULL_ID, point!(x: 0.0, y: 0.0), false).unwrap();
    let n2 = topo.add_iso_node(NULL_ID, point!(x: 10.0, y: 0.0), false).unwrap();
    let n3 = topo.add_iso_node(NULL_ID, point!(x: 10.0, y: 10.0), false).unwrap();
    let n4 = topo.add_iso_node(NULL_ID, point!(x: 0.0, y: 10.0), false).unwrap();
    [n1, n2, n3, n4]
}

/// Four edges counterclockwise around the corner nodes; the last one
/// closes the ring and creates a face. Returns (nodes, edges, face).
fn square(topo: &mut Topology<MemTopology>) -> ([ElemId; 4], [ElemId; 4], ElemId) {
    let [n1, n2, n3, n4] = square_corners(topo);
    let e1 = topo
        .add_edge_mod_face(n1, n2, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], false)
        .unwrap();
    let e2 = topo
        .add_edge_mod_face(n2, n3, line_string![(x: 10.0, y: 0.0), (x: 10.0, y: 10.0)], false)
        .unwrap();
    let e3 = topo
        .add_edge_mod_face(n3, n4, line_string![(x: 10.0, y: 10.0), (x: 0.0, y: 10.0)], false)
        .unwrap();
    let e4 = topo
        .add_edge_mod_face(n4, n1, line_string![(x: 0.0, y: 10.0), (x: 0.0, y: 0.0)], false)
        .unwrap();
    let face = topo.store().edge(e4).unwrap().face_left;
    ([n1, n2, n3, n4], [e1, e2, e3, e4], face)
}

#[test]
fn iso_node_roundtrip() {
    let mut topo = empty_topo();
    let n = topo.add_iso_node(NULL_ID, point!(x: 1.0, y: 2.0), false).unwrap();
    assert_eq!(topo.store().node(n).unwrap().containing_face, UNIVERSE_FACE);

    topo.move_iso_node(n, point!(x: 2.0, y: 2.0)).unwrap();
    assert_eq!(topo.store().node(n).unwrap().geom, point!(x: 2.0, y: 2.0));

    topo.remove_iso_node(n).unwrap();
    assert_eq!(topo.store().num_nodes(), 0);
}

#[test]
fn coincident_iso_node_is_rejected() {
    let mut topo = empty_topo();
    topo.add_iso_node(NULL_ID, point!(x: 1.0, y: 1.0), false).unwrap();
    assert_eq!(
        topo.add_iso_node(NULL_ID, point!(x: 1.0, y: 1.0), false),
        Err(TopologyError::CoincidentNode)
    );
}

#[test]
fn iso_node_on_edge_is_rejected() {
    let mut topo = empty_topo();
    let [n1, n2, ..] = square_corners(&mut topo);
    topo.add_edge_mod_face(n1, n2, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], false)
        .unwrap();
    assert_eq!(
        topo.add_iso_node(NULL_ID, point!(x: 4.0, y: 0.0), false),
        Err(TopologyError::EdgeCrossesNode)
    );
}

#[test]
fn iso_edge_restores_containing_face_on_removal() {
    let mut topo = empty_topo();
    let n1 = topo.add_iso_node(NULL_ID, point!(x: 0.0, y: 0.0), false).unwrap();
    let n2 = topo.add_iso_node(NULL_ID, point!(x: 5.0, y: 0.0), false).unwrap();
    let e = topo
        .add_iso_edge(n1, n2, line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0)])
        .unwrap();

    let edge = topo.store().edge(e).unwrap().clone();
    assert_eq!(edge.next_left, -e);
    assert_eq!(edge.next_right, e);
    assert_eq!(edge.face_left, UNIVERSE_FACE);
    assert_eq!(topo.store().node(n1).unwrap().containing_face, NULL_ID);
    assert_eq!(topo.store().node(n2).unwrap().containing_face, NULL_ID);

    topo.rem_iso_edge(e).unwrap();
    assert_eq!(topo.store().num_edges(), 0);
    assert_eq!(topo.store().node(n1).unwrap().containing_face, UNIVERSE_FACE);
    assert_eq!(topo.store().node(n2).unwrap().containing_face, UNIVERSE_FACE);
}

#[test]
fn iso_edge_endpoints_must_be_isolated() {
    let mut topo = empty_topo();
    let [n1, n2, n3, _] = square_corners(&mut topo);
    topo.add_edge_mod_face(n1, n2, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], false)
        .unwrap();
    assert_eq!(
        topo.add_iso_edge(n2, n3, line_string![(x: 10.0, y: 0.0), (x: 10.0, y: 10.0)]),
        Err(TopologyError::NonIsolatedNode)
    );
}

#[test]
fn rem_iso_edge_requires_dangling() {
    let mut topo = empty_topo();
    let (_, [e1, ..], _) = square(&mut topo);
    assert_eq!(topo.rem_iso_edge(e1), Err(TopologyError::EdgeNotDangling));
}

#[test]
fn two_edge_splitter() {
    let mut topo = empty_topo();
    let n1 = topo.add_iso_node(NULL_ID, point!(x: 0.0, y: 0.0), false).unwrap();
    let n2 = topo.add_iso_node(NULL_ID, point!(x: 10.0, y: 0.0), false).unwrap();
    let e1 = topo
        .add_edge_mod_face(n1, n2, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], false)
        .unwrap();

    let n3 = topo.mod_edge_split(e1, point!(x: 4.0, y: 0.0), false).unwrap();
    let node = topo.store().node(n3).unwrap();
    assert_eq!(node.geom, point!(x: 4.0, y: 0.0));
    assert_eq!(node.containing_face, NULL_ID);

    let first = topo.store().edge(e1).unwrap().clone();
    assert_eq!(first.geom, line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0)]);
    assert_eq!(first.end_node, n3);

    let e2 = first.next_left;
    assert!(e2 > 0 && e2 != e1);
    let second = topo.store().edge(e2).unwrap().clone();
    assert_eq!(second.geom, line_string![(x: 4.0, y: 0.0), (x: 10.0, y: 0.0)]);
    assert_eq!(second.start_node, n3);
    assert_eq!(second.end_node, n2);
    assert_eq!(second.face_left, UNIVERSE_FACE);
    assert_eq!(second.face_right, UNIVERSE_FACE);
    assert_eq!(first.face_left, UNIVERSE_FACE);
    assert_eq!(first.face_right, UNIVERSE_FACE);

    assert!(topo
        .store()
        .events
        .contains(&Event::EdgeSplit { split: e1, new1: e2, new2: None }));
}

#[test]
fn new_edges_split_renumbers_both_halves() {
    let mut topo = empty_topo();
    let n1 = topo.add_iso_node(NULL_ID, point!(x: 0.0, y: 0.0), false).unwrap();
    let n2 = topo.add_iso_node(NULL_ID, point!(x: 10.0, y: 0.0), false).unwrap();
    let e1 = topo
        .add_edge_mod_face(n1, n2, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], false)
        .unwrap();

    let n3 = topo.new_edges_split(e1, point!(x: 4.0, y: 0.0), false).unwrap();
    assert!(topo.store().edge(e1).is_none());
    assert_eq!(topo.store().num_edges(), 2);

    let mut halves: Vec<_> = topo.store().edges().cloned().collect();
    halves.sort_by_key(|e| e.edge_id);
    let (a, b) = (&halves[0], &halves[1]);
    assert_eq!(a.start_node, n1);
    assert_eq!(a.end_node, n3);
    assert_eq!(b.start_node, n3);
    assert_eq!(b.end_node, n2);
    assert_eq!(a.next_left, b.edge_id);
    assert_eq!(b.next_right, -a.edge_id);
    assert!(topo.store().events.contains(&Event::EdgeSplit {
        split: e1,
        new1: a.edge_id,
        new2: Some(b.edge_id),
    }));
}

#[test]
fn split_point_must_lie_on_edge() {
    let mut topo = empty_topo();
    let n1 = topo.add_iso_node(NULL_ID, point!(x: 0.0, y: 0.0), false).unwrap();
    let n2 = topo.add_iso_node(NULL_ID, point!(x: 10.0, y: 0.0), false).unwrap();
    let e1 = topo
        .add_edge_mod_face(n1, n2, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], false)
        .unwrap();
    assert!(matches!(
        topo.mod_edge_split(e1, point!(x: 4.0, y: 1.0), false),
        Err(TopologyError::InvalidGeometry(_))
    ));
}

#[test]
fn face_creation() {
    let mut topo = empty_topo();
    let (_, [e1, e2, e3, e4], face) = square(&mut topo);

    assert!(face > 0);
    let f = topo.store().face(face).unwrap();
    assert_eq!(f.mbr.min(), Coord { x: 0.0, y: 0.0 });
    assert_eq!(f.mbr.max(), Coord { x: 10.0, y: 10.0 });
    assert_eq!(topo.store().num_faces(), 1);

    // The side of each boundary edge looking at the square interior.
    for e in [e1, e2, e3, e4] {
        let edge = topo.store().edge(e).unwrap();
        assert_eq!(edge.face_left, face, "edge {} bounds the square on its left", e);
        assert_eq!(edge.face_right, UNIVERSE_FACE);
    }

    // Splitting the universe face emits no face-split notification.
    assert!(!topo
        .store()
        .events
        .iter()
        .any(|e| matches!(e, Event::FaceSplit { .. })));
}

#[test]
fn dangling_add_keeps_universe() {
    let mut topo = empty_topo();
    let ([n1, ..], _, _) = square(&mut topo);
    let n5 = topo
        .add_iso_node(NULL_ID, point!(x: -5.0, y: -5.0), false)
        .unwrap();
    let faces_before = topo.store().num_faces();

    let e5 = topo
        .add_edge_mod_face(n1, n5, line_string![(x: 0.0, y: 0.0), (x: -5.0, y: -5.0)], false)
        .unwrap();

    let edge = topo.store().edge(e5).unwrap();
    assert_eq!(edge.face_left, UNIVERSE_FACE);
    assert_eq!(edge.face_right, UNIVERSE_FACE);
    assert_eq!(topo.store().num_faces(), faces_before);
    assert_eq!(topo.store().node(n5).unwrap().containing_face, NULL_ID);
}

#[test]
fn heal_two_edges() {
    let mut topo = empty_topo();
    let n1 = topo.add_iso_node(NULL_ID, point!(x: 0.0, y: 0.0), false).unwrap();
    let n2 = topo.add_iso_node(NULL_ID, point!(x: 10.0, y: 0.0), false).unwrap();
    let e1 = topo
        .add_edge_mod_face(n1, n2, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], false)
        .unwrap();
    let n3 = topo.mod_edge_split(e1, point!(x: 4.0, y: 0.0), false).unwrap();
    let e2 = topo.store().edge(e1).unwrap().next_left;

    let removed = topo.mod_edge_heal(e1, e2).unwrap();
    assert_eq!(removed, n3);
    assert!(topo.store().node(n3).is_none());
    assert!(topo.store().edge(e2).is_none());

    let healed = topo.store().edge(e1).unwrap();
    assert_eq!(
        healed.geom,
        line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 10.0, y: 0.0)]
    );
    assert_eq!(healed.start_node, n1);
    assert_eq!(healed.end_node, n2);
    assert_eq!(healed.next_left, -e1);
    assert_eq!(healed.next_right, e1);

    assert!(topo.store().events.contains(&Event::EdgeHeal {
        e1,
        e2,
        new_edge: e1
    }));
}

#[test]
fn heal_rejects_third_edge_at_node() {
    let mut topo = empty_topo();
    let n1 = topo.add_iso_node(NULL_ID, point!(x: 0.0, y: 0.0), false).unwrap();
    let n2 = topo.add_iso_node(NULL_ID, point!(x: 10.0, y: 0.0), false).unwrap();
    let n3 = topo.add_iso_node(NULL_ID, point!(x: 5.0, y: 5.0), false).unwrap();
    let e1 = topo
        .add_edge_mod_face(n1, n2, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], false)
        .unwrap();
    let mid = topo.mod_edge_split(e1, point!(x: 4.0, y: 0.0), false).unwrap();
    let e2 = topo.store().edge(e1).unwrap().next_left;
    let e3 = topo
        .add_edge_mod_face(mid, n3, line_string![(x: 4.0, y: 0.0), (x: 5.0, y: 5.0)], false)
        .unwrap();

    assert_eq!(
        topo.mod_edge_heal(e1, e2),
        Err(TopologyError::HealDegreeMismatch(vec![e3]))
    );
}

#[test]
fn new_edge_heal_in_all_junction_cases() {
    // The four ways two collinear edges can share the middle node: by
    // end/start, end/end, start/start and start/end.
    struct Case {
        e1: (f64, f64),
        e2: (f64, f64),
        merged_start: f64,
        merged_end: f64,
    }
    let cases = [
        Case { e1: (0.0, 5.0), e2: (5.0, 10.0), merged_start: 0.0, merged_end: 10.0 },
        Case { e1: (0.0, 5.0), e2: (10.0, 5.0), merged_start: 0.0, merged_end: 10.0 },
        Case { e1: (5.0, 0.0), e2: (5.0, 10.0), merged_start: 10.0, merged_end: 0.0 },
        Case { e1: (5.0, 0.0), e2: (10.0, 5.0), merged_start: 10.0, merged_end: 0.0 },
    ];
    for case in cases {
        let mut topo = empty_topo();
        let node_at = |topo: &mut Topology<MemTopology>, x: f64| {
            let existing = topo.get_node_by_point(&point!(x: x, y: 0.0), 0.0).unwrap();
            existing.unwrap_or_else(|| {
                topo.add_iso_node(NULL_ID, point!(x: x, y: 0.0), false).unwrap()
            })
        };
        let a0 = node_at(&mut topo, case.e1.0);
        let a1 = node_at(&mut topo, case.e1.1);
        let e1 = topo
            .add_edge_mod_face(
                a0,
                a1,
                line_string![(x: case.e1.0, y: 0.0), (x: case.e1.1, y: 0.0)],
                false,
            )
            .unwrap();
        let b0 = node_at(&mut topo, case.e2.0);
        let b1 = node_at(&mut topo, case.e2.1);
        let e2 = topo
            .add_edge_mod_face(
                b0,
                b1,
                line_string![(x: case.e2.0, y: 0.0), (x: case.e2.1, y: 0.0)],
                false,
            )
            .unwrap();

        let healed = topo.new_edge_heal(e1, e2).unwrap();
        assert!(topo.store().edge(e1).is_none());
        assert!(topo.store().edge(e2).is_none());
        let merged = topo.store().edge(healed).unwrap();
        assert_eq!(merged.geom.0.first().map(|c| c.x), Some(case.merged_start));
        assert_eq!(merged.geom.0.last().map(|c| c.x), Some(case.merged_end));
        // The shared node at x = 5 is gone.
        assert_eq!(topo.store().num_nodes(), 2);
        assert!(topo
            .get_node_by_point(&point!(x: 5.0, y: 0.0), 0.0)
            .unwrap()
            .is_none());
    }
}

#[test]
fn add_edge_splits_face_and_rem_edge_restores_it() {
    let mut topo = empty_topo();
    let ([n1, _, n3, _], [e1, e2, e3, e4], face) = square(&mut topo);

    let diag = topo
        .add_edge_mod_face(n1, n3, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 10.0)], false)
        .unwrap();

    assert_eq!(topo.store().num_faces(), 2);
    let new_face = topo.store().edge(diag).unwrap().face_left;
    assert_ne!(new_face, face);
    assert_eq!(topo.store().edge(diag).unwrap().face_right, face);
    // Upper-left triangle boundary looks at the new face.
    assert_eq!(topo.store().edge(e3).unwrap().face_left, new_face);
    assert_eq!(topo.store().edge(e4).unwrap().face_left, new_face);
    // Lower-right boundary still bounds the kept face.
    assert_eq!(topo.store().edge(e1).unwrap().face_left, face);
    assert_eq!(topo.store().edge(e2).unwrap().face_left, face);
    assert!(topo.store().events.contains(&Event::FaceSplit {
        split: face,
        new1: new_face,
        new2: None
    }));

    let flood = topo.rem_edge_mod_face(diag).unwrap();
    assert_eq!(flood, face);
    assert_eq!(topo.store().num_faces(), 1);
    for e in [e1, e2, e3, e4] {
        assert_eq!(topo.store().edge(e).unwrap().face_left, face);
        assert_eq!(topo.store().edge(e).unwrap().face_right, UNIVERSE_FACE);
    }
    assert!(topo.store().events.contains(&Event::FaceHeal {
        f1: face,
        f2: new_face,
        new_face: face
    }));
}

#[test]
fn add_edge_new_faces_replaces_the_split_face() {
    let mut topo = empty_topo();
    let ([n1, _, n3, _], _, face) = square(&mut topo);

    topo.add_edge_new_faces(n1, n3, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 10.0)], false)
        .unwrap();

    assert!(topo.store().face(face).is_none(), "split face is replaced");
    assert_eq!(topo.store().num_faces(), 2);
    let split_event = topo
        .store()
        .events
        .iter()
        .find_map(|e| match e {
            Event::FaceSplit { split, new1, new2 } => Some((*split, *new1, *new2)),
            _ => None,
        })
        .expect("face split notified");
    assert_eq!(split_event.0, face);
    assert!(split_event.2.is_some());
}

#[test]
fn removing_boundary_toward_universe_floods_with_universe() {
    let mut topo = empty_topo();
    let (_, [e1, e2, e3, e4], face) = square(&mut topo);

    let flood = topo.rem_edge_mod_face(e1).unwrap();
    assert_eq!(flood, UNIVERSE_FACE);
    assert!(topo.store().face(face).is_none());
    for e in [e2, e3, e4] {
        let edge = topo.store().edge(e).unwrap();
        assert_eq!(edge.face_left, UNIVERSE_FACE);
        assert_eq!(edge.face_right, UNIVERSE_FACE);
    }
}

#[test]
fn removing_last_edge_isolates_endpoints() {
    let mut topo = empty_topo();
    let n1 = topo.add_iso_node(NULL_ID, point!(x: 0.0, y: 0.0), false).unwrap();
    let n2 = topo.add_iso_node(NULL_ID, point!(x: 10.0, y: 0.0), false).unwrap();
    let e1 = topo
        .add_edge_mod_face(n1, n2, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], false)
        .unwrap();

    topo.rem_edge_mod_face(e1).unwrap();
    assert_eq!(topo.store().node(n1).unwrap().containing_face, UNIVERSE_FACE);
    assert_eq!(topo.store().node(n2).unwrap().containing_face, UNIVERSE_FACE);
}

#[test]
fn side_location_conflict() {
    let mut topo = empty_topo();
    let (_, _, face) = square(&mut topo);
    // One endpoint inside the square, the other outside.
    let inside = topo.add_iso_node(NULL_ID, point!(x: 5.0, y: 5.0), false).unwrap();
    assert_eq!(topo.store().node(inside).unwrap().containing_face, face);
    let outside = topo
        .add_iso_node(NULL_ID, point!(x: 15.0, y: 5.0), false)
        .unwrap();
    assert_eq!(
        topo.store().node(outside).unwrap().containing_face,
        UNIVERSE_FACE
    );

    let err = topo.add_edge_mod_face(
        inside,
        outside,
        line_string![(x: 5.0, y: 5.0), (x: 15.0, y: 5.0)],
        true,
    );
    assert!(matches!(err, Err(TopologyError::SideLocationConflict(_, _))));
}

#[test]
fn change_edge_geom_moves_and_updates_mbr() {
    let mut topo = empty_topo();
    let (_, [e1, ..], face) = square(&mut topo);

    topo.change_edge_geom(
        e1,
        line_string![(x: 0.0, y: 0.0), (x: 5.0, y: -2.0), (x: 10.0, y: 0.0)],
    )
    .unwrap();

    let f = topo.store().face(face).unwrap();
    assert_eq!(f.mbr.min(), Coord { x: 0.0, y: -2.0 });
    assert_eq!(f.mbr.max(), Coord { x: 10.0, y: 10.0 });
}

#[test]
fn change_edge_geom_motion_collision() {
    let mut topo = empty_topo();
    let n1 = topo.add_iso_node(NULL_ID, point!(x: 0.0, y: 0.0), false).unwrap();
    let n2 = topo.add_iso_node(NULL_ID, point!(x: 10.0, y: 0.0), false).unwrap();
    let e1 = topo
        .add_edge_mod_face(n1, n2, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], false)
        .unwrap();
    topo.add_iso_node(NULL_ID, point!(x: 5.0, y: 1.0), false).unwrap();

    // The new course sweeps across the isolated node.
    let err = topo.change_edge_geom(
        e1,
        line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 2.0), (x: 10.0, y: 0.0)],
    );
    assert!(matches!(err, Err(TopologyError::MotionCollision(_))));
    // No writes happened.
    assert_eq!(
        topo.store().edge(e1).unwrap().geom,
        line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]
    );
}

#[test]
fn change_edge_geom_endpoint_nodes_do_not_collide() {
    // Only the edge's own endpoints fall in the motion range: allowed.
    let mut topo = empty_topo();
    let n1 = topo.add_iso_node(NULL_ID, point!(x: 0.0, y: 0.0), false).unwrap();
    let n2 = topo.add_iso_node(NULL_ID, point!(x: 10.0, y: 0.0), false).unwrap();
    let e1 = topo
        .add_edge_mod_face(n1, n2, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], false)
        .unwrap();
    topo.change_edge_geom(
        e1,
        line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 2.0), (x: 10.0, y: 0.0)],
    )
    .unwrap();
}

#[test]
fn change_edge_geom_crossing_rejected() {
    let mut topo = empty_topo();
    let (_, [e1, ..], _) = square(&mut topo);
    // Scenario "motion collision": the new line crosses the opposite side.
    let err = topo.change_edge_geom(
        e1,
        line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 20.0), (x: 10.0, y: 0.0)],
    );
    assert!(matches!(
        err,
        Err(TopologyError::EdgeCrossesEdge(_)) | Err(TopologyError::MotionCollision(_))
    ));
}

#[test]
fn change_closed_edge_winding_flip_rejected() {
    let mut topo = empty_topo();
    let n1 = topo.add_iso_node(NULL_ID, point!(x: 0.0, y: 0.0), false).unwrap();
    let ring = topo
        .add_edge_mod_face(
            n1,
            n1,
            line_string![
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 5.0, y: 8.0),
                (x: 0.0, y: 0.0)
            ],
            false,
        )
        .unwrap();
    let err = topo.change_edge_geom(
        ring,
        line_string![
            (x: 0.0, y: 0.0),
            (x: 5.0, y: 8.0),
            (x: 10.0, y: 0.0),
            (x: 0.0, y: 0.0)
        ],
    );
    assert!(matches!(err, Err(TopologyError::MotionCollision(_))));
}

#[test]
fn closed_edge_creates_face() {
    let mut topo = empty_topo();
    let n1 = topo.add_iso_node(NULL_ID, point!(x: 0.0, y: 0.0), false).unwrap();
    let ring = topo
        .add_edge_mod_face(
            n1,
            n1,
            line_string![
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 5.0, y: 8.0),
                (x: 0.0, y: 0.0)
            ],
            false,
        )
        .unwrap();
    assert_eq!(topo.store().num_faces(), 1);
    let edge = topo.store().edge(ring).unwrap();
    let face = topo.store().faces().next().unwrap().face_id;
    // Counterclockwise ring: interior on the left.
    assert_eq!(edge.face_left, face);
    assert_eq!(edge.face_right, UNIVERSE_FACE);
}

#[test]
fn get_face_by_point_in_square() {
    let mut topo = empty_topo();
    let (_, _, face) = square(&mut topo);
    assert_eq!(topo.get_face_by_point(&point!(x: 5.0, y: 5.0), 0.0).unwrap(), face);
    assert_eq!(
        topo.get_face_by_point(&point!(x: 15.0, y: 5.0), 0.0).unwrap(),
        UNIVERSE_FACE
    );
}

#[test]
fn get_face_by_point_on_shared_boundary_is_ambiguous() {
    let mut topo = empty_topo();
    square(&mut topo);
    assert_eq!(
        topo.get_face_by_point(&point!(x: 0.0, y: 0.0), 0.0),
        Err(TopologyError::AmbiguousLocation("faces"))
    );
}

#[test]
fn node_and_edge_point_queries() {
    let mut topo = empty_topo();
    let ([n1, ..], [e1, ..], _) = square(&mut topo);
    assert_eq!(
        topo.get_node_by_point(&point!(x: 0.1, y: 0.1), 0.5).unwrap(),
        Some(n1)
    );
    assert_eq!(topo.get_node_by_point(&point!(x: 5.0, y: 5.0), 0.5).unwrap(), None);
    assert_eq!(
        topo.get_edge_by_point(&point!(x: 5.0, y: 0.1), 0.5).unwrap(),
        Some(e1)
    );
    assert_eq!(
        topo.get_node_by_point(&point!(x: 5.0, y: 5.0), 20.0),
        Err(TopologyError::AmbiguousLocation("nodes"))
    );
}

#[test]
fn face_geometry_of_square() {
    let mut topo = empty_topo();
    let (_, _, face) = square(&mut topo);
    let poly = topo.face_geometry(face).unwrap();
    assert_eq!(poly.interiors().len(), 0);
    let ring = poly.exterior();
    assert_eq!(ring.0.first(), ring.0.last());
    assert_eq!(ring.0.len(), 5);
    assert!(topo.face_geometry(UNIVERSE_FACE).is_err());
}

#[test]
fn rem_edge_new_face_replaces_both_faces() {
    let mut topo = empty_topo();
    let ([n1, _, n3, _], [e1, ..], face) = square(&mut topo);
    let diag = topo
        .add_edge_mod_face(n1, n3, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 10.0)], false)
        .unwrap();
    let second = topo.store().edge(diag).unwrap().face_left;

    let merged = topo.rem_edge_new_face(diag).unwrap();
    assert!(merged > 0 && merged != face && merged != second);
    assert!(topo.store().face(face).is_none());
    assert!(topo.store().face(second).is_none());
    assert_eq!(topo.store().num_faces(), 1);
    assert_eq!(topo.store().edge(e1).unwrap().face_left, merged);
    assert!(topo.store().events.contains(&Event::FaceHeal {
        f1: face,
        f2: second,
        new_face: merged
    }));
}

#[test]
fn add_iso_node_verifies_explicit_face() {
    let mut topo = empty_topo();
    let (_, _, face) = square(&mut topo);
    // Claiming the wrong face is rejected; the right one works.
    assert_eq!(
        topo.add_iso_node(face, point!(x: 50.0, y: 50.0), false),
        Err(TopologyError::NotWithinFace)
    );
    let n = topo.add_iso_node(face, point!(x: 5.0, y: 5.0), false).unwrap();
    assert_eq!(topo.store().node(n).unwrap().containing_face, face);
}

#[test]
fn move_iso_node_cannot_change_face() {
    let mut topo = empty_topo();
    let (_, _, face) = square(&mut topo);
    let n = topo.add_iso_node(face, point!(x: 5.0, y: 5.0), false).unwrap();
    assert_eq!(
        topo.move_iso_node(n, point!(x: 50.0, y: 50.0)),
        Err(TopologyError::NotWithinFace)
    );
    topo.move_iso_node(n, point!(x: 6.0, y: 6.0)).unwrap();
    assert_eq!(topo.store().node(n).unwrap().containing_face, face);
}

#[test]
fn get_face_by_point_with_tolerance_votes_through_edges() {
    let mut topo = empty_topo();
    let (_, _, face) = square(&mut topo);
    // Just outside the square, but within tolerance of its boundary.
    assert_eq!(
        topo.get_face_by_point(&point!(x: 5.0, y: -0.5), 1.0).unwrap(),
        face
    );
    // Far from any boundary the universe stands.
    assert_eq!(
        topo.get_face_by_point(&point!(x: 50.0, y: 50.0), 1.0).unwrap(),
        UNIVERSE_FACE
    );
}

#[test]
fn lollipop_edge_derives_faces_from_stick() {
    // A dangling stick plus a closed loop at its end.
    let mut topo = empty_topo();
    let n1 = topo.add_iso_node(NULL_ID, point!(x: -5.0, y: 0.0), false).unwrap();
    let n2 = topo.add_iso_node(NULL_ID, point!(x: 0.0, y: 0.0), false).unwrap();
    topo.add_edge_mod_face(n1, n2, line_string![(x: -5.0, y: 0.0), (x: 0.0, y: 0.0)], false)
        .unwrap();
    let loop_edge = topo
        .add_edge_mod_face(
            n2,
            n2,
            line_string![
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 5.0, y: 8.0),
                (x: 0.0, y: 0.0)
            ],
            false,
        )
        .unwrap();
    assert_eq!(topo.store().num_faces(), 1);
    let edge = topo.store().edge(loop_edge).unwrap();
    assert_eq!(edge.face_right, UNIVERSE_FACE);
    assert!(edge.face_left > 0);
}
