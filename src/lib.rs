//! Field Battle - deterministic turn-based field battles on procedural maps

pub mod battle;
pub mod core;
