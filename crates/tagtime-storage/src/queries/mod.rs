// SPDX-FileCopyrightText: 2026 TagTime Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Every function takes `&Database` and runs through
//! the single connection; all values are bound as parameters.

pub mod goals;
pub mod points;
pub mod samples;
pub mod schedule;
