//! Integration tests for redquery-redshift crate.
//!
//! These tests drive the full submit → poll → fetch lifecycle against a
//! scripted fake service, without AWS credentials. Tests marked with
//! `#[ignore]` require AWS credentials and must be run explicitly.

mod blocking;
mod end_to_end;
mod fake;
mod live;
