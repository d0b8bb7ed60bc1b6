//! Wire DTOs for the ping API.
//!
//! # Design
//! Defined independently from the mock-server crate. Integration tests catch
//! any schema drift between the two.

use serde::{Deserialize, Serialize};

/// Single-key JSON body `{"num": <integer>}` posted to `/v1/ping/json`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NumPayload {
    pub num: i64,
}
