//! # Tables Library
//!
//! In-memory model of one course on the learning-management site: groups,
//! students, teachers, assignments, one submission slot per group and
//! assignment, and the grade/submit actions of the activity log.
//!
//! ## Key Concepts
//! - **Raw tables**: flat rows handed over by a [`traits::source::TableSource`].
//! - **Graph**: [`model::Tables`], arenas linked by typed indices, built in one
//!   pass by [`builder::EntityGraphBuilder`] and read-only afterwards.
//! - **Grade state**: derived on demand from a submission's
//!   [`timeline::Timeline`] by [`resolver::resolve`], never stored.
//! - **Store**: [`store::TableStore`] fetches concurrently, builds, caches and
//!   publishes one graph per course.

pub mod builder;
pub mod cache;
pub mod error;
pub mod fetch;
pub mod model;
pub mod queries;
pub mod raw;
pub mod report;
pub mod resolver;
pub mod sources;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod timeline;
pub mod traits;
pub mod types;

pub use builder::{BuildOutcome, EntityGraphBuilder, build_tables};
pub use cache::TableCache;
pub use error::{CacheError, IntegrityWarning, SourceFetchError};
pub use fetch::FetchPool;
pub use model::Tables;
pub use store::TableStore;
pub use types::{AssignmentId, CourseId, GradeState, PersonId};
