//! The automation routines.
//!
//! Each submodule is one runnable routine: it collects remote state through
//! the capability traits in [`crate::clients`], applies the decision rules
//! from [`crate::rules`] and issues mutations through a
//! [`crate::dispatch::Dispatcher`].

pub mod boards;
pub mod branches;
pub mod docs;
pub mod milestone;
pub mod pull_requests;
pub mod stale;
pub mod triage;
pub mod workflows;

#[cfg(test)]
pub(crate) mod testing;
