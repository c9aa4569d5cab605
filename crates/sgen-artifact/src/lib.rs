//! SGEN Artifact Types
//!
//! The documents that the generation pipeline produces and talks about.
//!
//! # Core Concepts
//!
//! - [`ScriptArtifact`]: fixed header plus mutable script body
//! - [`CorrectionLog`]: append-only user/system exchange for one correction loop
//! - [`ContentHash`]: Blake3 checksum of an artifact's exposed text
//!
//! # Example
//!
//! ```rust
//! use sgen_artifact::{CorrectionLog, CorrectionLogEntry, ScriptArtifact};
//!
//! let mut artifact = ScriptArtifact::with_default_header();
//! artifact.replace_body("INSERT INTO t VALUES (1);\n");
//! assert!(artifact.text().ends_with("INSERT INTO t VALUES (1);\n"));
//!
//! let mut log = CorrectionLog::new();
//! log.append(CorrectionLogEntry::user("use two rows"));
//! assert_eq!(log.len(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifact;
mod hash;
mod log;

pub use artifact::{ScriptArtifact, HEADER_SEPARATOR, SCRIPT_HEADER};
pub use hash::{ContentHash, HashError};
pub use log::{CorrectionLog, CorrectionLogEntry, Role};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
