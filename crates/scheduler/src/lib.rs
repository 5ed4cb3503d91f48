//! Derivation scheduling primitives for the overlay core
//!
//! Page derivations (decode, rasterize, build the text layer) may overlap:
//! an initial load can still be in flight when a resize asks for a new one.
//! This crate provides the pieces used to supersede stale work instead of
//! letting two derivations publish over each other.
//!
//! - [`CancellationToken`]: cooperative cancellation shared with in-flight work
//! - [`GenerationGate`]: monotonically numbered tickets; beginning a new one
//!   cancels the previous ticket and marks it stale
//! - [`Debouncer`]: last-value-wins trigger that fires after a quiet window
//!
//! # Example
//!
//! ```
//! use pdf_overlay_scheduler::GenerationGate;
//!
//! let gate = GenerationGate::new();
//! let first = gate.begin();
//! let second = gate.begin();
//!
//! // The first derivation was superseded and should discard its results
//! assert!(first.token.is_cancelled());
//! assert!(!gate.is_current(first.generation));
//! assert!(gate.is_current(second.generation));
//! ```

mod cancel;
mod debounce;
mod generation;

pub use cancel::CancellationToken;
pub use debounce::Debouncer;
pub use generation::{GenerationGate, Ticket};
