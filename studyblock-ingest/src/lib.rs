//! studyblock-ingest: assignment and commitment adapters feeding the core
//! planner (JSON files, CSV schedules, Canvas LMS).

pub mod canvas;
pub mod estimate;
pub mod source;
pub mod types;

pub use canvas::{CanvasClient, CanvasCourse, filter_upcoming};
pub use estimate::{AssignmentClassifier, AssignmentKind, infer_priority};
pub use source::{AvailabilitySource, CombinedSource, CsvCommitments, NoCommitments, StaticCommitments};
pub use types::{AssignmentRecord, load_assignments_json, records_into_tasks};
