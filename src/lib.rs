//! A settle-once deferred value cell with ordered observer chains.
//!
//! A [`Deferred<T, E>`] is eventually fulfilled with a `T` or rejected with
//! an `E`, exactly once. Any number of observers may register before or
//! after settlement; each receives the outcome exactly once, in registration
//! order, and may transform the value carried to the observers behind it,
//! either inline or asynchronously through an explicit [`Advance`] handle.
//!
//! Use it assignment style within a single function:
//!
//! ```
//! use deferred_cell::Deferred;
//!
//! let cell: Deferred<String, String> = Deferred::new();
//! cell.then(|value| {
//!     assert_eq!(value, "done");
//!     None
//! });
//! cell.resolve("done".into()).unwrap();
//! ```
//!
//! Or return the handle to ease chaining of callbacks:
//!
//! ```
//! use deferred_cell::Deferred;
//!
//! fn fetch_user() -> Deferred<String, String> {
//!     let cell = Deferred::new();
//!     // hand cell.settler() to the async work, return immediately
//!     cell.settler()(Ok("bob".into())).unwrap();
//!     cell
//! }
//!
//! fetch_user().then(|name| {
//!     assert_eq!(name, "bob");
//!     None
//! });
//! ```
//!
//! The cell is a single-threaded cooperative primitive: "asynchronous" means
//! deferred continuation through callbacks, never parallelism. Two policies
//! are deliberate: a second settlement attempt is reported to the caller as
//! [`Error::AlreadySettled`] and otherwise ignored, and a panic inside an
//! observer is not caught, so it aborts the traversal in progress.

mod access;
mod cell;
mod observer;
mod wait;

pub use access::{Field, Invoke};
pub use cell::{Deferred, Kind};
pub use observer::{Advance, Observer};
pub use wait::Waiter;

/// Errors surfaced by the settlement API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A second settlement attempt; the first outcome stands.
    #[error("cell already settled")]
    AlreadySettled,
}

/// Crate version, as published.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
