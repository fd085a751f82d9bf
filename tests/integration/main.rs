//! Integration test binary -- all integration tests consolidated into a single
//! binary to keep link time down.

// Allow unwrap/expect in test code
#![allow(clippy::unwrap_used, clippy::expect_used)]


mod end_to_end;
mod frame_loop;
mod reply_flow;
mod session_reset;
