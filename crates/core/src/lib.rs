//! Core of routetypes: turns file-routed API handlers into named request and
//! response type declarations.
//!
//! The pipeline per build:
//! - [`config`] resolves the project layout and the tsconfig root file set
//! - [`program`] parses those files into a declaration arena that answers
//!   [`oracle::TypeOracle`] queries
//! - [`route`] derives the route key and positional parameters from a file path
//! - [`extractor`] finds the default-exported method table and resolves each
//!   handler's request and response through [`encoder`]
//! - [`synth`] names the declarations and merges route parameters into the query
//! - [`build`] runs the above per file and [`emit`] renders the artifact text
//! - [`write`] persists the artifact only when its content changed

pub mod build;
pub mod config;
pub mod emit;
pub mod encoder;
pub mod error;
pub mod extractor;
pub mod naming;
pub mod oracle;
pub mod program;
pub mod route;
pub mod synth;
pub mod types;
pub mod write;

pub use build::build;
pub use config::{ConfigOptions, Configuration, FrameworkTypes};
pub use error::{BuildError, ConfigError};
pub use write::{WriteOutcome, write_artifact};
