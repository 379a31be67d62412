//! Leasing a DRM output from a Wayland compositor and rendering offscreen into GBM buffers.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod card;
pub mod config;
pub mod event_loop;
pub mod fps;
pub mod lease;
pub mod offscreen;
