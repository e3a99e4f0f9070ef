//! # sc-av
//!
//! External tool management and the audio-to-SILK conversion pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- resolve ffmpeg and the SILK
//!   encoder once at startup.
//! - **Command execution** ([`ToolCommand`]) -- async runner that streams a
//!   child's output into the log while waiting for it to exit.
//! - **Input resolution** ([`InputResolver`]) -- stage uploads, downloads and
//!   local paths as files the transcoder can read.
//! - **Conversion** ([`SilkConverter`]) -- transcode to PCM, encode to SILK,
//!   and clean up intermediates on every path.

pub mod command;
pub mod input;
pub mod naming;
pub mod pipeline;
pub mod scratch;
pub mod stages;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use input::{ConversionInput, InputResolver, StagedInput};
pub use naming::{ArtifactNames, SILK_EXTENSION};
pub use pipeline::{ConversionOutput, SilkConverter};
pub use scratch::ScratchFile;
pub use tools::{ToolConfig, ToolInfo, ToolRegistry, ToolSource};
