// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. All functions accept `&Database` and run their
//! closures on the single background connection thread.

pub mod links;
pub mod messages;
pub mod rules;
pub mod sessions;
