mod batch;
mod orchestrator;
pub mod report;

pub use batch::{discover_images, BatchDriver, COMBINED_FILE_NAME};
pub use orchestrator::Orchestrator;
pub use report::{availability_banner, summarize, write_json, RecordNamer};
