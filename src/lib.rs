//! Ranks the lanes of an intersection by vehicle count, picks one priority lane per scan cycle
//! and renders the decision as an annotated mosaic.
//!
//! Layout follows ports and adapters: `domain` holds the lane model and ranking rules,
//! `application` the use cases and the ports they call through, `adapters` the concrete
//! detector, frame sources, controller links and display.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
