//! Reconciliation against the home screen
//!
//! - `guard` - single-flight, minimum-interval admission of passes
//! - `reconcile` - prune shortcuts the user removed from the home screen
//! - `verification` - post-create pin confirmation protocol
//! - `engine` - facade owning every component, user operations and
//!   lifecycle hooks

mod engine;
mod guard;
mod reconcile;
mod verification;


pub use engine::{CreatedShortcut, DeleteOutcome, PassReport, PassTrigger, SyncEngine};
pub use guard::{GuardPermit, ReconcileGuard};
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use verification::{PinVerifier, VerificationOutcome, VerificationState};
