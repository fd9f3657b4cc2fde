//! Batch slicing of downloaded meshes with external slicer executables
//!
//! - [`runner`] - the [`SlicerRunner`] seam over process execution
//! - [`batch`] - the pass over the input directory and the drain loop
//!
//! Output layout: `<output_dir>/<profile name>/<config file stem>/<mesh stem>.gcode`.
//! A mesh is moved to `completed_dir` once every profile and config has been tried
//! on it, whatever the individual results were.

pub mod batch;
pub mod runner;

pub use batch::{SliceBatch, SliceSummary};
pub use runner::{CliSlicerRunner, SliceJob, SlicerRunner, resolve_executable};
