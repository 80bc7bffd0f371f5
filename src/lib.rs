//! Class-schedule engine behind a live "now in class / starting soon" banner.
//!
//! [`schedule`] holds the pure time and query functions, [`banner`] keeps a
//! mounted banner current, and [`broadcast`] carries `timeFormatChanged`
//! between the format toggle and every mounted banner.

pub mod api;
pub mod banner;
pub mod broadcast;
pub mod diagnostics;
pub mod schedule;
pub mod settings;
pub mod time_provider;
