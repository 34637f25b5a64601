pub mod ids;
pub mod priority;
pub mod record;

pub use ids::{JobId, LeaseToken};
pub use priority::Priority;
pub use record::{JobRecord, JobStatus};
