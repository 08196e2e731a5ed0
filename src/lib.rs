//! Workspace root crate.
//!
//! Exists only to host workspace-wide tooling (git hooks via cargo-husky).
//! All functionality lives in the `crates/*` members.
