//! # concord-core: inter-annotator agreement for annotation exports
//!
//! Reads a Label Studio JSON export and measures how consistently annotators
//! labeled the same items.
//!
//! The pipeline is extract -> score -> aggregate -> render:
//! 1. [`export`] parses the export into closed record types
//! 2. [`detect`] works out whether the export holds classification, span or
//!    paragraph judgments
//! 3. [`extract`] builds per-item, per-annotator judgment tables
//! 4. [`metrics`] scores annotator pairs (percent agreement, Cohen's kappa,
//!    span exact match) and the whole panel (Krippendorff's alpha)
//! 5. [`report`] assembles and renders the result
//!
//! ```no_run
//! use concord_core::{Export, ReportConfig, generate_report};
//!
//! let export = Export::from_path("export.json".as_ref())?;
//! let report = generate_report(&export, &ReportConfig::default())?;
//! println!("{report}");
//! # Ok::<(), concord_core::ConcordError>(())
//! ```

pub mod config;
pub mod detect;
pub mod error;
pub mod export;
pub mod extract;
pub mod metrics;
pub mod report;

pub use config::{ConcordConfig, ReportConfig, load_config};
pub use detect::{TaskType, detect_task_type};
pub use error::{ConcordError, Result};
pub use export::{Export, Ident};
pub use report::{AgreementReport, ReportFormat, assemble, generate_report};
