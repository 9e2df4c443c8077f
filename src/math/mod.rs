// src/math/mod.rs

pub mod geometry;

pub use geometry::{rotate_planar, unit_or_zero, yaw_towards};
