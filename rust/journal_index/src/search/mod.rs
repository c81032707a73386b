//! Substring verification and match highlighting.

pub mod literal;

pub use literal::{find_all_matches, normalize, normalize_into, LiteralMatcher};
