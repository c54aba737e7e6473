pub mod aggregate;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod funnel;
pub mod lifecycle;
pub mod model;
pub mod service;
pub mod store;
pub mod tenant;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{CoreError, Result};
pub use service::CrmService;
pub use store::{CrmRepository, CrmStore};
pub use tenant::{TenantContext, UniquenessGuard};
