//! API handlers for tessera.
//!
//! This module organizes the service's route handlers: authentication and
//! verification under `auth`, the admin-gated role resource under `roles`,
//! plus `health` and the undocumented root banner.

pub mod auth;
pub mod health;
pub mod roles;
pub mod root;
