//! Post-response regeneration of stale pages.
//!
//! After a response is committed, the trigger inspects its cache-control.
//! A stale-while-revalidate response served outside a regeneration pass
//! schedules one detached regeneration request for the same path.

mod decision;
mod dispatcher;
mod trigger;

pub use decision::*;
pub use dispatcher::*;
pub use trigger::*;
