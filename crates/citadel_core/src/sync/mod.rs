//! # Synchronization Primitives for the Admission Path
//!
//! ## The Problem
//!
//! ```text
//! Network threads:  APPEND commands (many, concurrent)
//! Tick thread:      PROCESS commands (one, expensive)
//!
//! One shared queue + one lock:   producers wait on processing cost
//! ```
//!
//! ## The Solution: Double Buffering
//!
//! ```text
//! Tick N:
//!   Producers append to buffer A
//!   Tick iterates buffer B (last swap) without touching the lock
//!
//! Tick N+1:
//!   SWAP (pointer exchange under the same short lock)
//!   Producers append to buffer B
//!   Tick iterates buffer A
//! ```
//!
//! Producers never wait longer than one append or one swap.

mod swap_buffer;

pub use swap_buffer::SwapBuffer;
