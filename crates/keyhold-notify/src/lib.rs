// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push notifications for the keyhold agent.
//!
//! [`frame`] turns raw hub messages into [`NotificationEvent`]s,
//! [`NotificationChannel`] runs one connection and dispatches events to the
//! sync engine, and [`NotificationDaemon`] keeps reconnecting for as long as
//! the agent runs.
//!
//! [`NotificationEvent`]: keyhold_core::NotificationEvent

pub mod channel;
pub mod daemon;
pub mod frame;

pub use channel::{ChannelExit, ConnectionState, NotificationChannel, push_url};
pub use daemon::{DaemonExit, DaemonSettings, NotificationDaemon};
pub use frame::{HANDSHAKE, decode_frame};
