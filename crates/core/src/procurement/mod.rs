//! Procurement requests and their approval lifecycle.

pub mod error;
pub mod service;
pub mod types;

pub use error::ProcurementError;
pub use service::ProcurementService;
pub use types::{CreateRequestInput, LinkedEnvelopes, ProcurementRequest, RequestStatus};
