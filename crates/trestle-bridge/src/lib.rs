//! Bridge runtime connecting a Discord support forum to Zendesk.
//!
//! Hosts the thread-to-ticket correlation store, the inbound event handlers,
//! the append-only audit log, and the gateway adapter that feeds Discord
//! events into the runtime.

mod bridge_runtime;

pub use bridge_runtime::{
    parse_ticket_marker, render_ticket_marker, run_discord_gateway, AuditLog, BridgeRuntime,
    BridgeRuntimeConfig, ConsistencyPolicy, CorrelationError, MessageCreated, ThreadCreated,
    TICKET_MARKER_PREFIX,
};
