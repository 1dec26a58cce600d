// radar_core/src/lib.rs

// This file defines the public modules of the library.
pub mod config;
pub mod error;
pub mod estimation;
pub mod geometry;
pub mod hardware;
pub mod locator;
pub mod prelude;
pub mod runtime;
pub mod snapshot;
pub mod sweep;
pub mod task;
pub mod track;
