// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Link registry for the Guestlink engine.
//!
//! Owner-authenticated link lifecycle (create, revoke, expiry sweep) plus
//! the single enumeration-proof token-to-link resolution path.

pub mod policy;
pub mod registry;

pub use policy::{BehavioralPayload, LinkPolicy};
pub use registry::{CreatedLink, LinkRegistry};
