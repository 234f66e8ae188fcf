//! Zendesk Tickets API client for the trestle bridge.

mod zendesk_api;

pub use zendesk_api::{api_base_for_subdomain, ZendeskApiClient, ZendeskTicket};
