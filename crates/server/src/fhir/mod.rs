//! Upstream FHIR server access

mod client;
pub mod patient_data;

pub use client::FhirClient;
