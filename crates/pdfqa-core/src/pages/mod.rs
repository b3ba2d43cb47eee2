//! Page selection for extracted PDF text.
//!
//! Users describe the pages they care about with a 1-based range expression
//! (`"1-5,8,10-15"`); [`range`] turns that into a sorted, deduplicated set of
//! 0-based indices, and [`filter`] cuts the matching page segments out of the
//! extracted text using the page-boundary markers the extractor emits.

pub mod filter;
pub mod range;

pub use filter::{FilterAnomaly, FilterOutcome, FilterReport, Filtered, PageFilter, find_markers};
pub use range::{PageIndexSet, PageRangeError, parse, validate};
