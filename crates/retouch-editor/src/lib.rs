// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// retouch-editor — The async edit session that sequences raster operations
// into a history, plus its two narrow collaborators: the remote enhancement
// gateway and the activity sink.

pub mod gateway;
pub mod session;
pub mod telemetry;

pub use gateway::{EnhanceRequest, EnhanceResponse, EnhancementGateway, EnhancementProvider, RemoteOperation};
pub use session::EditSession;
pub use telemetry::{ActivitySink, ChannelSink, MemorySink, NullSink, TracingSink};
