//! The sweep engine.
//!
//! A [`Sweeper`] walks a paginated recordings listing and applies a
//! [`RecordAction`] to every eligible recording, running at most
//! `concurrency_limit` actions at once through a [`Throttle`]. Per-record
//! failures are collected as [`ActionOutcome`] values and folded into a
//! [`FailureLedger`]; the sweep stops when the listing runs out, the record
//! ceiling is reached, or the failure budget is used up.
//!
//! ```text
//! Sweeper ── page ──▶ Throttled<RecordAction> ──▶ outcomes ──▶ FailureLedger
//!    ▲                                                              │
//!    └──────────── next page? (budget, ceiling, cursor) ◀───────────┘
//! ```

mod accounting;
mod action;
mod controller;
mod error;
mod hooks;
mod outcome;
mod source;
#[cfg(test)]
pub(crate) mod testing;
mod throttle;

pub use accounting::{FailureLedger, PageTally};
pub use action::RecordAction;
pub use controller::Sweeper;
pub use error::{ActionError, ApiError, HookError, SweepError};
pub use hooks::{ArchiveHook, RecordHook, RecordHooks};
pub use outcome::{ActionOutcome, RecordFailure, SkipReason, SweepResult, TerminalReason};
pub use source::RecordingSource;
pub use throttle::{Throttle, Throttled, throttle};
