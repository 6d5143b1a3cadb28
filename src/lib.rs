//! Client-side building blocks for the surveillance platform console.
//!
//! The backend owns devices, stream sessions and cascade registration; this
//! crate wraps its REST contract ([`api`]), coordinates the live video wall
//! ([`session`]) and binds stream URLs to playback engines ([`player`]).

pub mod api;
pub mod config;
pub mod flv;
pub mod notify;
pub mod player;
pub mod session;
