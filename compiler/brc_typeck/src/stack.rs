//! Stack safety for recursive type inference.
//!
//! Uses the `stacker` crate to ensure sufficient stack space for deeply
//! nested expressions (chained access, nested composite literals).

/// Ensure sufficient stack space for recursive operations.
///
/// Grows the stack if remaining space is less than 256KB, allocating up to 2MB.
pub fn ensure_sufficient_stack<R, F: FnOnce() -> R>(f: F) -> R {
    stacker::maybe_grow(256 * 1024, 2 * 1024 * 1024, f)
}
