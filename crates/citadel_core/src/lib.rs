//! # Citadel Core
//!
//! Primitives shared by the admission path and the simulation tick:
//!
//! - [`Handle`] / [`Arena`]: generational slots for live simulation state
//! - [`EntityId`]: externally visible identifier of characters, items and world objects
//! - [`SwapBuffer`]: the double-buffered write/read pair behind every inbox
//!
//! ## Threading Model
//!
//! ```text
//! network threads ──push──▶ SwapBuffer (write side, short mutex)
//!                                │ swap (O(1)) at tick start
//!                                ▼
//!                      tick thread (read side, owns Arena state)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use citadel_core::{Arena, SwapBuffer};
//!
//! let inbox: SwapBuffer<u32> = SwapBuffer::with_capacity(500);
//! inbox.try_push(7, 500).ok();
//!
//! let mut batch = Vec::new();
//! inbox.swap_into(&mut batch);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod arena;
pub mod component;
pub mod handle;
pub mod sync;

pub use arena::Arena;
pub use component::WorldPosition;
pub use handle::{EntityId, Handle};
pub use sync::SwapBuffer;
