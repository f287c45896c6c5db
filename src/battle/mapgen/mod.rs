//! Procedural battlefield generation
//!
//! Every calculator places one kind of feature by growing clusters of
//! sectors; the builder runs them in order to produce a complete map.

pub mod altitude;
pub mod builder;
pub mod cluster;
pub mod dimensions;
pub mod forest;
pub mod fort;
pub mod river;
pub mod road;
pub mod settlement;
pub mod strategic;

pub use builder::{GeneratedMap, MapBuilder, MapRequest};
pub use cluster::ClusterCalculator;
pub use dimensions::MapDimensions;
pub use strategic::assign_owners;
