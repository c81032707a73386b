//! Compressed trigram index for substring search over log messages.
//!
//! # Architecture
//!
//! - **varint** : delta + varint codec for strictly increasing ordinals
//! - **blocks** : append-only byte store backing each posting list
//! - **posting** : compressed posting lists and their intersection
//! - **extract** : trigram extraction over characters
//! - **index** : trigram → posting list map with candidate search
//! - **error** : codec contract violations

pub mod blocks;
pub mod error;
pub mod extract;
pub mod index;
pub mod posting;
pub mod varint;

pub use blocks::{BlockBuffer, BlockSizing};
pub use error::CodecError;
pub use extract::{extract_trigrams, Trigram, NGRAM_LEN};
pub use index::{Candidates, TrigramIndex};
pub use posting::{intersect, PostingList};
