//! Layered dependency maps of Nix store paths.
//!
//! The pipeline queries `nix-store -q --graph` for each root, merges the
//! results into one [`nix::Graph`], levels it by distance from the roots,
//! lays it out with a small force simulation and renders a PNG.

pub mod config;
pub mod error;
pub mod export;
pub mod layout;
pub mod nix;
pub mod render;
pub mod util;

pub use config::Config;
pub use error::{Result, VisualizeError};
