//! HTTP ingress for the trestle bridge.
//!
//! Serves the signed command-interaction endpoint and the inbound ticketing
//! webhook that relays Zendesk comments back into Discord threads.

mod http_server;

pub use http_server::{
    build_http_server_state, parse_commenter_route, run_http_server, CommenterRoute,
    HttpServerConfig,
};
