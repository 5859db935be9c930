//! Pipeline service implementations.
//!
//! Each service owns a cheap clone of the database handle and the injected
//! configuration it needs; none of them hold state of their own.

pub mod analytics_service;
pub mod invoice_service;
pub mod quotation_service;
