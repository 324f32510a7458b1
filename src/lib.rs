//! Build citation records from the Highwire Press `citation_*` meta tags that most
//! publishers embed in article pages.
//!
//! ```no_run
//! let record = citegrab::classify_from_url(
//!     "doe2020",
//!     "https://www.nature.com/articles/s41586-020-2649-2",
//!     ["to-read"],
//! )?;
//! if let Some(block) = record.render_citation_string() {
//!     println!("{block}");
//! }
//! # Ok::<(), citegrab::Error>(())
//! ```
//!
//! The pipeline is page text → [`highwire::extract_tags`] → [`TagMap`] →
//! [`classifier::classify`] → [`CitationRecord`]. Records are classified as journal,
//! conference or preprint, in that order of preference.

pub mod classifier;
pub mod error;
pub mod highwire;
pub mod record;
pub mod report;
pub mod resolver;

pub use classifier::{classify, classify_from_mapping};
pub use error::{AttemptFailure, Error, FieldProblem, Result};
pub use highwire::{TagMap, TagValue, extract_tags};
pub use record::{
    Author, CitationRecord, ConferenceInfo, DateParts, JournalInfo, PreprintInfo,
    PublicationDate, Shape, TagInput, Venue, normalize_date, split_authors,
};
pub use report::{NullReporter, Reporter, TracingReporter};
pub use resolver::{
    FetchConfig, HttpFetcher, PageFetcher, Resolver, classify_from_file, classify_from_url,
};
