//! Reputation module - identity lookups, feedback authorization and the
//! feedback ledger

pub mod authorizer;
pub mod identity;
pub mod ledger;

pub use authorizer::{AuthorizationOutcome, AuthorizationStatus, FeedbackAuthorization, FeedbackAuthorizer};
pub use identity::{AgentIdentity, AuthorizationReceipt, DisabledIdentityRegistry, IdentityRegistry, SigningKey};
pub use ledger::{FeedbackLedger, FeedbackRecord};
