//! Scene deployment: request parsing, quota, the validation pipeline and
//! read-side queries over accepted deploys.

pub mod orchestrator;
pub mod queries;
pub mod quota;
pub mod request;

pub use orchestrator::{Collaborators, DeployLimits, DeployReceipt, DeploymentService};
pub use queries::{ContentQueries, ParcelContent};
pub use quota::{check_freshness, QuotaGuard};
pub use request::{RawPart, UploadRequest, UploadedFile};
