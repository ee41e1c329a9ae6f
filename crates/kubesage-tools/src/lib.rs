//! Kubesage Tools - Safety-Gated Diagnostic Execution
//!
//! This crate provides the command layer for Kubesage:
//! - Safety: read-only verb allowlist and injection rejection
//! - Executor: kubectl invocation with timeouts and outcome triage
//! - Parse: structured parsing of in-pod directory listings

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod executor;
pub mod parse;
pub mod safety;

pub use executor::{
    CommandResult, KubectlExecutor, PodDirListing, PodFileContent, CONNECTION_ERROR_PATTERNS,
};
pub use parse::{parse_ls_output, FileKind, PodFileEntry};
pub use safety::{
    contains_shell_metacharacters, validate_args, validate_command, verify_path_safety, Verdict,
    READ_ONLY_VERBS, SHELL_METACHARACTERS,
};
