// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

pub mod binding;
pub mod cache;
pub mod coordinator;
pub mod session;
