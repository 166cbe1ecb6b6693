pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod stages;

pub use error::{DocumentError, NormalizeWarning};
pub use io::{
    BatchReport, Blacklist, FilterConfig, ProtocolSummary, filter_submissions,
    read_submissions_file,
};
pub use models::{
    CellLineInfo, DurationSpec, ProtocolDocument, SentinelKey, StepRecord, SubmissionRecord,
};
pub use pipeline::{
    BatchResult, NormalizedProtocol, PipelineConfig, normalize_batch, normalize_document,
    normalize_submission,
};
pub use stages::{
    AttributeConfig, DurationConfig, LayoutConfig, balance_proportions, place_final_step,
    prune_empty_steps, remap_keys, resolve_duration, resolve_steps,
};
