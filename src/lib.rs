//! Core library for the `veneto-epi` command line application.
//!
//! The library turns daily case and hospital snapshots into consistent time
//! series. Responsibilities are kept narrow and composable: name resolution
//! lives in [`canonical`], series assembly in [`series`], rollups in
//! [`aggregate`], validation in [`check`] and [`reconcile`], table shaping in
//! [`tables`], file adapters under [`io`], and the run orchestration in
//! [`pipeline`].

pub mod aggregate;
pub mod canonical;
pub mod check;
pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod series;
pub mod tables;

pub use error::{Result, ToolError};
