//! Integration Tests Module
//!
//! Drives the analysis session end to end against a scripted provider:
//! upload validation, encoding, the diagnosis call, state transitions and
//! preview handle bookkeeping.

// Scripted provider and counting preview host
mod support;

// Session state machine scenarios
mod session_test;

// Image loading, validation and encoding from disk
mod upload_test;
