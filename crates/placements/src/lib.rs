//! Core library for the university placement management service.
//!
//! Students submit placement requests to providers, providers and tutors
//! review them in sequence, tutors schedule company visits, and students
//! submit reports once a placement is approved. The HTTP surface lives in
//! the `placements-api` service crate; this library holds the domain
//! logic behind repository and notification seams.

pub mod accounts;
pub mod config;
pub mod error;
pub mod notify;
pub mod telemetry;
pub mod workflows;
