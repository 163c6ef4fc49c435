//! Revocation ledger storage.

pub mod ledger;

pub use ledger::{RevocationLedger, WriteOutcome, WritePolicy};
