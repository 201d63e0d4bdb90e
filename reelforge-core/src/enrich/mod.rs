mod composition;
mod draft;
mod narration;
mod pipeline;
mod subtitles;

pub use composition::{CompositionPreparer, MASTER_SEQUENCE};
pub use narration::{NarrationAudio, NarrationService};
pub use pipeline::{EnrichmentPipeline, EnrichmentResult};
pub use subtitles::build_subtitles;
