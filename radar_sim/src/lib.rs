// radar_sim/src/lib.rs

// The application side of the radar: everything that needs Bevy, a
// configuration file or a simulated board lives here.
pub mod board;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod headless;
pub mod link;
