//! `warden-core` — foundation building blocks shared by every warden crate.
//!
//! This crate contains **pure** primitives (no infrastructure concerns):
//! the error taxonomy, identifiers, optimistic concurrency and time.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod id;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, AuthResult, ErrorKind};
pub use id::{CredentialsId, TenantId, RESERVED_PLATFORM_ID};
