// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

pub mod gas;
pub mod local_wallet;
pub mod nonce;
pub mod price_feed;
pub mod provider;
pub mod revert;
pub mod wallet;
