//! SGEN Correction
//!
//! Pure, total text passes applied to generated SQL scripts.
//!
//! # Core Operations
//!
//! - **Strip**: remove markdown code fences ([`strip_code_fence`], [`strip_streaming_fence`])
//! - **Correct**: repair terminators, dangling separators and unclosed groups ([`correct`])
//! - **Validate**: report residual defects without editing ([`validate`])
//! - **Tag**: pull the script's short identifier out of its first tagged insert ([`extract_script_tag`])
//!
//! None of these passes parse SQL. They repair and flag the specific shapes
//! the generator is known to produce and nothing more.
//!
//! # Example
//!
//! ```rust
//! use sgen_correct::{correct, strip_code_fence, validate};
//!
//! let raw = "```sql\nINSERT INTO t VALUES (1, (2, 3\n```";
//! let body = correct(strip_code_fence(raw));
//! assert_eq!(body, "INSERT INTO t VALUES (1, (2, 3));\n");
//! assert!(validate(&body).is_clean());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod correct;
mod fence;
mod patterns;
mod tag;
mod validate;

pub use correct::{correct, group_balance};
pub use fence::{strip_code_fence, strip_streaming_fence};
pub use tag::extract_script_tag;
pub use validate::{validate, Defect, ValidationReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
