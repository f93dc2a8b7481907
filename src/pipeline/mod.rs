//! Pipeline stages for one submission.
//!
//! Each submodule implements exactly one step, so each can be tested on
//! its own and the network stage can be swapped out.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ request ──▶ render
//! (selection) (multipart) (POST /predict) (JSON → text)
//! ```
//!
//! 1. [`input`]   — read the current zero-or-one file selection
//! 2. [`encode`]  — wrap the bytes in a single-part multipart form
//! 3. [`request`] — one POST to the prediction route; the only stage with
//!    network I/O
//! 4. [`render`]  — parse the body as JSON and pretty-print it

pub mod encode;
pub mod input;
pub mod render;
pub mod request;
