//! Shared traits and types for Blitz
//!
//! The types in this crate sit at the seam between the scrolling subsystem
//! ([blitz-scrolling](https://docs.rs/blitz-scrolling)) and the code that embeds it:
//!
//!  - [`geometry`]: typed layout-space geometry.
//!  - [`events`]: platform-neutral wheel events and gesture phases.
//!  - [`page`]: the provider trait through which the page's layout facts are read
//!    and through which the main thread is notified of scroll position changes.

pub mod events;
pub mod geometry;
pub mod page;
