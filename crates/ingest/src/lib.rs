pub mod enrich;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod scheduler;
pub mod source;

pub use error::{EnrichError, FetchError, IngestError, NormalizeError};
pub use pipeline::{CycleReport, CycleTask, Pipeline};
pub use scheduler::{Scheduler, SchedulerStats};
pub use source::{IngestSource, RawPayload, SourceDescriptor, SourceKind};
