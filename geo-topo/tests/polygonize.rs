//! Face recovery over face-less edge loads.

use geo_topo::storage::MemTopology;
use geo_topo::{Topology, TopologyError, NULL_ID, UNIVERSE_FACE};
use geo_types::{line_string, point, LineString};

fn empty_topo() -> Topology<MemTopology> {
    Topology::new(MemTopology::new())
}

fn square_ring(x0: f64, y0: f64, size: f64) -> LineString<f64> {
    line_string![
        (x: x0, y: y0),
        (x: x0 + size, y: y0),
        (x: x0 + size, y: y0 + size),
        (x: x0, y: y0 + size),
        (x: x0, y: y0)
    ]
}

#[test]
fn polygonize_empty_topology_is_a_noop() {
    let mut topo = empty_topo();
    topo.polygonize().unwrap();
    assert_eq!(topo.store().num_faces(), 0);
}

#[test]
fn polygonize_requires_empty_face_table() {
    let mut topo = empty_topo();
    topo.add_line(&square_ring(0.0, 0.0, 10.0), 0.01).unwrap();
    assert_eq!(topo.store().num_faces(), 1);
    assert!(matches!(
        topo.polygonize(),
        Err(TopologyError::CorruptedTopology(_))
    ));
}

#[test]
fn polygonize_square() {
    let mut topo = empty_topo();
    let ids = topo.add_line_no_face(&square_ring(0.0, 0.0, 10.0), 0.01).unwrap();
    assert_eq!(topo.store().num_faces(), 0);
    for id in &ids {
        let edge = topo.store().edge(id.abs()).unwrap();
        assert_eq!(edge.face_left, NULL_ID);
        assert_eq!(edge.face_right, NULL_ID);
    }

    topo.polygonize().unwrap();

    assert_eq!(topo.store().num_faces(), 1);
    let face = topo.store().faces().next().unwrap().clone();
    for edge in topo.store().edges() {
        // One side bounds the recovered face, the other the universe.
        let sides = [edge.face_left, edge.face_right];
        assert!(sides.contains(&face.face_id));
        assert!(sides.contains(&UNIVERSE_FACE));
    }
    assert_eq!(
        topo.get_face_by_point(&point!(x: 5.0, y: 5.0), 0.0).unwrap(),
        face.face_id
    );
}

#[test]
fn polygonize_assigns_holes_to_their_shell() {
    let mut topo = empty_topo();
    topo.add_line_no_face(&square_ring(0.0, 0.0, 20.0), 0.01).unwrap();
    topo.add_line_no_face(&square_ring(5.0, 5.0, 5.0), 0.01).unwrap();

    topo.polygonize().unwrap();

    // Outer ring face and inner ring face.
    assert_eq!(topo.store().num_faces(), 2);
    let outer = topo
        .get_face_by_point(&point!(x: 2.0, y: 2.0), 0.0)
        .unwrap();
    let inner = topo
        .get_face_by_point(&point!(x: 7.0, y: 7.0), 0.0)
        .unwrap();
    assert!(outer > 0 && inner > 0 && outer != inner);

    // The outer face's geometry carries the island as a hole.
    let outer_poly = topo.face_geometry(outer).unwrap();
    assert_eq!(outer_poly.interiors().len(), 1);
    let inner_poly = topo.face_geometry(inner).unwrap();
    assert_eq!(inner_poly.interiors().len(), 0);
}

#[test]
fn polygonize_two_disjoint_components() {
    let mut topo = empty_topo();
    topo.add_line_no_face(&square_ring(0.0, 0.0, 10.0), 0.01).unwrap();
    topo.add_line_no_face(&square_ring(100.0, 0.0, 10.0), 0.01).unwrap();

    topo.polygonize().unwrap();

    assert_eq!(topo.store().num_faces(), 2);
    let a = topo.get_face_by_point(&point!(x: 5.0, y: 5.0), 0.0).unwrap();
    let b = topo
        .get_face_by_point(&point!(x: 105.0, y: 5.0), 0.0)
        .unwrap();
    assert!(a > 0 && b > 0 && a != b);
    assert_eq!(
        topo.get_face_by_point(&point!(x: 50.0, y: 5.0), 0.0).unwrap(),
        UNIVERSE_FACE
    );
}

#[test]
fn polygonize_with_dangling_edge() {
    let mut topo = empty_topo();
    topo.add_line_no_face(&square_ring(0.0, 0.0, 10.0), 0.01).unwrap();
    // A dangling tail out of the square's corner.
    topo.add_line_no_face(
        &line_string![(x: 10.0, y: 10.0), (x: 20.0, y: 20.0)],
        0.01,
    )
    .unwrap();

    topo.polygonize().unwrap();

    assert_eq!(topo.store().num_faces(), 1);
    let tail = topo
        .get_edge_by_point(&point!(x: 15.0, y: 15.0), 0.5)
        .unwrap()
        .expect("tail edge");
    let tail_edge = topo.store().edge(tail).unwrap();
    assert_eq!(tail_edge.face_left, UNIVERSE_FACE);
    assert_eq!(tail_edge.face_right, UNIVERSE_FACE);
}

#[test]
fn cancellation_stops_polygonize() {
    let mut topo = empty_topo();
    topo.add_line_no_face(&square_ring(0.0, 0.0, 10.0), 0.01).unwrap();
    topo.cancel_token().cancel();
    assert_eq!(topo.polygonize(), Err(TopologyError::Cancelled));
    assert_eq!(topo.store().num_faces(), 0);
}
