//! Verification record lifecycle: the record, the ownership lock that guards
//! it, and the officer-facing service.

mod clock;
pub mod domain;
pub mod policy;
mod repository;
mod service;

pub use clock::{civil_time, Clock, FixedClock, SystemClock, REPORTING_UTC_OFFSET_HOURS};
pub use domain::{
    Coordinate, Idsbr, OperatingStatus, Ownership, ValidationError, VerificationRecord,
    VerificationSubmission, VerificationUpdate,
};
pub use policy::{Decision, LockConflict, ProceedReason, WriteGate};
pub use repository::{VerificationStore, WriteOutcome};
pub use service::{VerificationError, VerificationService};
