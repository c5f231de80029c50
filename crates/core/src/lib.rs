//! emr-core: shared types and clinical logic for the EMR gateway
//!
//! This crate is I/O free. It provides the FHIR shapes the gateway reads
//! (Bundle, OperationOutcome), the `{success, data}` response envelope, the
//! registry of proxied resource types, and the clinical decision support
//! engines (sepsis screening, fall and readmission risk, care gaps, drug
//! interactions).

pub mod bundle;
pub mod cds;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod ndc;
pub mod outcome;
pub mod resource;

pub use bundle::{Bundle, BundleEntry, BundleLink, BundleType};
pub use envelope::Envelope;
pub use error::{EmrError, EmrResult};
pub use ndc::Ndc;
pub use outcome::{IssueSeverity, OperationOutcome, OperationOutcomeIssue};
pub use resource::ResourceType;
