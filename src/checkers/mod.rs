//! Built-in checkers (SPEC_FULL.md §4.6, §4.7).

pub mod missing_check;
pub mod thread_safety;

pub use missing_check::MissingCheck;
pub use thread_safety::ThreadSafety;
