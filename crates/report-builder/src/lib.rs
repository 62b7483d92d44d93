//! Report definition builder.
//!
//! The builder is a pure reducer over [`BuilderState`]: every command
//! produces a new state or a [`BuilderError`]. [`BuilderSession`] wraps it
//! with undo/redo, and [`validate`] reports every problem with the result at
//! once.
//!
//! ```
//! use report_builder::{BuilderSession, ValidationContext};
//! use report_model::{ExportTarget, SourceKind};
//!
//! let mut session = BuilderSession::default();
//! let source = session.add_source(SourceKind::AdCampaigns).unwrap();
//! assert_eq!(source.id.as_str(), "direct_1");
//!
//! session.set_export(ExportTarget::existing("abc123", "Report")).unwrap();
//! let today = chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
//! assert!(session.validate(ValidationContext::preview(today)).is_valid());
//! ```

pub mod availability;
pub mod command;
pub mod error;
pub mod options;
pub mod reducer;
pub mod session;
pub mod validate;

pub use availability::SourceAvailability;
pub use command::{AdCampaignPatch, BuilderCommand, CounterPatch, SourcePatch, TransformPatch};
pub use error::{BuilderError, Result};
pub use options::{BuilderOptions, DEFAULT_HISTORY_LIMIT, RemovalPolicy};
pub use reducer::{BuilderContext, BuilderState, reduce};
pub use session::BuilderSession;
pub use validate::{ValidationContext, ValidationPurpose, prepare_submission, validate};
