//! Shared types for the RPC generator.
//!
//! - [`span`]: byte-offset spans and line lookup
//! - [`method`]: the scanned method model and dispatch identifiers
//! - [`error`]: the fatal per-declaration error taxonomy

pub mod error;
pub mod method;
pub mod span;

pub use error::{DeclError, DeclErrorKind};
pub use method::{Location, Method, MethodArgument, MethodType, TypeKind};
pub use span::{LineIndex, Span};
