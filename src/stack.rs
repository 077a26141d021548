//! Stack growth for the recursive parser and evaluator.
//!
//! Both walk the tree with native recursion, so a deeply nested program or
//! a deep chain of calls can exhaust a small thread stack long before the
//! nesting and call-depth limits are reached. Recursive entry points wrap
//! their work in [`ensure_sufficient_stack`].

/// Grow when less than this remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
