//! Routers grouped by who may call them. Access control is applied once per
//! module as a route layer in `create_router`; handlers only add ownership and
//! clinic checks on top.

/// No session required.
pub mod public;

/// Any signed-in user, whatever their role.
pub mod authenticated;

/// Clinic administrators only.
pub mod admin;

/// Health workers only.
pub mod health_worker;
