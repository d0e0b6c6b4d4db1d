pub mod record;
pub mod segment;
pub mod subject;

pub use record::{
    AnalysisRequest, AnalysisResponse, HabitRecord, HistoryRecord, PseudonymousId, SubjectSummary,
};
pub use segment::Segment;
pub use subject::{Subject, ALL_SUBJECTS};
