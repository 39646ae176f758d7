// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tripgether hand-off: moving shared links from the Share Extension to the
// main app. The producer appends one batch per share action to a bounded
// queue in the shared store; the consumer drains it when the app comes to the
// foreground.

pub mod consumer;
pub mod debug_log;
pub mod extract;
pub mod producer;
pub mod queue;

pub use consumer::{Consumer, ConsumerState};
pub use debug_log::DebugLogRing;
pub use extract::{Attachment, StaticAttachment};
pub use producer::{ShareCompletion, ShareProducer};
pub use queue::ShareQueue;
