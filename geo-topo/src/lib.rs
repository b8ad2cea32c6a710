#![warn(missing_debug_implementations)]
//! The `geo-topo` crate implements an ISO SQL/MM style planar topology
//! engine over [`geo-types`] geometries: a persistent subdivision of the
//! plane into nodes, edges and faces, stitched together by signed
//! "next edge around face" links.
//!
//! # Operations
//!
//! - **Primitive operators** mutate the topology while preserving its
//!   invariants: [`Topology::add_iso_node`], [`Topology::add_iso_edge`],
//!   [`Topology::mod_edge_split`], [`Topology::new_edges_split`],
//!   [`Topology::mod_edge_heal`], [`Topology::new_edge_heal`],
//!   [`Topology::add_edge_mod_face`], [`Topology::add_edge_new_faces`],
//!   [`Topology::rem_edge_mod_face`], [`Topology::rem_edge_new_face`],
//!   [`Topology::change_edge_geom`] and friends.
//! - **Population operators** accept raw geometry and integrate it within a
//!   snapping tolerance: [`Topology::add_point`], [`Topology::add_line`],
//!   [`Topology::add_polygon`], [`Topology::load_geometry`].
//! - **Queries** locate elements: [`Topology::get_node_by_point`],
//!   [`Topology::get_edge_by_point`], [`Topology::get_face_by_point`],
//!   [`Topology::get_face_containing_point`], [`Topology::face_geometry`].
//! - **[`Topology::polygonize`]** recovers faces on a topology populated
//!   with face-less edges.
//!
//! Storage is abstract: the engine talks to a [`storage::TopoStorage`] +
//! [`storage::TopoEvents`] backend. An in-memory reference backend,
//! [`storage::MemTopology`], is bundled.
//!
//! [`geo-types`]: https://crates.io/crates/geo-types

pub use geo_topo_types::{columns, Edge, ElemId, Face, Node, NULL_ID, UNIVERSE_FACE};

mod edgeend;
mod error;
pub mod kernel;
mod linework;
pub mod storage;
mod topology;

pub use error::{LineEnd, TopoResult, TopologyError};
pub use topology::{CancelToken, FaceHandling, Topology};
