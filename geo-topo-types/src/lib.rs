#![warn(missing_debug_implementations)]
//! The `geo-topo-types` library defines the persistent element types of the
//! [`geo-topo`](https://crates.io/crates/geo-topo) planar topology engine.
//!
//! A topology is a planar subdivision made of three element kinds:
//!
//! - **[`Node`]**: a point, optionally *isolated* inside a face
//! - **[`Edge`]**: a non-self-intersecting linestring between two nodes,
//!   carrying the faces on its two sides and the signed "next edge" links
//!   that stitch face boundaries together
//! - **[`Face`]**: a polygonal region identified by its id and MBR; the
//!   unbounded *universe* face has id [`UNIVERSE_FACE`] and is never stored
//!
//! Element geometries are [`geo-types`] values with `f64` coordinates.
//!
//! [`geo-types`]: https://crates.io/crates/geo-types

pub use geo_types;

mod elements;
pub use elements::{Edge, Face, Node};

pub mod columns;

/// Identifier of a topology element.
///
/// Node and edge identifiers are always positive; face identifiers are
/// non-negative, with `0` reserved for the universe face. Where an edge
/// identifier appears *signed* (ring walks, `next_left`/`next_right` links)
/// the sign encodes traversal direction: positive walks the edge from start
/// node to end node, negative the opposite way.
pub type ElemId = i64;

/// Identifier of the unbounded universe face.
///
/// The universe face has no stored row and no MBR; it appears only as a
/// value of `face_left`/`face_right`/`containing_face`.
pub const UNIVERSE_FACE: ElemId = 0;

/// The "no element" sentinel.
///
/// As a `containing_face` it means the node is not isolated. On an edge's
/// `face_left`/`face_right` it only ever appears on edges registered through
/// the face-less loading path, pending a later polygonize pass.
pub const NULL_ID: ElemId = -1;
