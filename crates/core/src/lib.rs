//! Core business logic for Procura.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `approval` - Approval chain evaluation, planning and transitions
//! - `budget` - Budget envelopes and availability checks
//! - `procurement` - Procurement request lifecycle

pub mod approval;
pub mod budget;
pub mod procurement;
