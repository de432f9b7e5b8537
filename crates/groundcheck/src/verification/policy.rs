//! Ownership soft lock deciding whether a verification write may land.
//!
//! A verified record belongs to the officer who verified it. Only that officer
//! or an administrator may write it again; peers are turned away. Nothing ever
//! unlocks a record: ownership moves only when the owner resubmits or an
//! administrator overrides.

use serde::Serialize;

use super::domain::Ownership;
use crate::auth::{Officer, OfficerIdentity};

/// Which precondition a write must pass before it is applied.
///
/// Interactive submissions go through [`WriteGate::OwnershipChecked`]. Bulk
/// reconciliation uses [`WriteGate::Unconditional`] and overrides whoever owns
/// the record, which is why those jobs only run in maintenance windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteGate {
    OwnershipChecked(Officer),
    Unconditional,
}

impl WriteGate {
    pub fn evaluate(&self, current: &Ownership) -> Decision {
        match self {
            WriteGate::OwnershipChecked(requester) => decide(current, requester),
            WriteGate::Unconditional => Decision::Proceed(ProceedReason::Unconditional),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Proceed(ProceedReason),
    Reject(LockConflict),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProceedReason {
    Unverified,
    SameOwner,
    AdminOverride,
    Unconditional,
}

impl ProceedReason {
    pub fn label(&self) -> &'static str {
        match self {
            ProceedReason::Unverified => "unverified",
            ProceedReason::SameOwner => "same_owner",
            ProceedReason::AdminOverride => "admin_override",
            ProceedReason::Unconditional => "unconditional",
        }
    }
}

/// The record is verified and owned by someone other than the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockConflict {
    pub owner: Option<OfficerIdentity>,
}

pub fn decide(current: &Ownership, requester: &Officer) -> Decision {
    if !current.is_verified {
        return Decision::Proceed(ProceedReason::Unverified);
    }

    let owned_by_requester = current
        .owner
        .as_ref()
        .is_some_and(|owner| owner.email == requester.identity.email);
    if owned_by_requester {
        return Decision::Proceed(ProceedReason::SameOwner);
    }

    if requester.is_admin() {
        return Decision::Proceed(ProceedReason::AdminOverride);
    }

    Decision::Reject(LockConflict {
        owner: current.owner.clone(),
    })
}
