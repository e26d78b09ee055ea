//! Pure text utilities for report listings: event-date normalisation,
//! kana width/script conversion and search phrase splitting.

pub mod date;
mod freetext;
pub mod format;
pub mod kana;
pub mod terms;

pub use date::{normalize, Clock, DateNormalizer, FixedClock, SystemClock};
pub use kana::{to_hankaku_katakana, to_zenkaku_katakana};
pub use terms::{split_terms, term_variants, TermVariantSet};
