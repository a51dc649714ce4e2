//! Actuation grid and the anchor-search controller.

pub mod anchor_search;
pub mod grid;
