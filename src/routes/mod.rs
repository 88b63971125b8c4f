//! Router Module Index
//!
//! `public` carries the unauthenticated surface. `authors` carries the author
//! resource, mounted under the configured prefix behind the credential middleware.

/// Health check, open to everyone.
pub mod public;

/// Author CRUD. Every route requires credentials; mutations by id also require admin.
pub mod authors;
