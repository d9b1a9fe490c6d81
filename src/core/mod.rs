//! Framework-agnostic booking logic.
//!
//! Every operation takes a database connection (or a transaction) and plain
//! input values; the HTTP layer and the background jobs are thin callers.

pub mod combo;
pub mod expiry;
pub mod film;
pub mod invoice;
pub mod pricing;
pub mod reconcile;
pub mod room;
pub mod seats;
pub mod showtime;
pub mod ticket;
pub mod transaction;
pub mod voucher;
