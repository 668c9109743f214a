//! Purpose: Shared core library crate used by the `esedump` CLI and tests.
//! Exports: `core` (reader boundary, guards, decoding, extraction, errors).
//! Role: Internal library backing the binary; not yet a stable public SDK.
//! Invariants: Treat the crate API as internal until a dedicated library release.
//! Invariants: Record data is only reachable through the `EseBackend` boundary.
pub mod api;
pub mod core;
