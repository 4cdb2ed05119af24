//! Result file management.
//!
//! Every analysis run writes three files, one per [`ExportFormat`](crate::export::ExportFormat):
//!
//! ```text
//! outputs/
//!   graphs/<project>_<YYYYmmdd_HHMMSS_ffffff>.json
//!   reports/<project>_<YYYYmmdd_HHMMSS_ffffff>.json
//!   metrics/<project>_<YYYYmmdd_HHMMSS_ffffff>.csv
//! ```

pub mod manager;

pub use manager::{OutputManager, OutputSummary, RunFiles, WriteError, STAMP_FORMAT};
