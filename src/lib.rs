//! Bridge between a Mattermost server and a generic event/action schema.
//!
//! Maintains one persistent websocket session, translates platform events
//! into platform-agnostic events for a host automation engine, and
//! dispatches generic actions (`send`) back through the REST API.
//!
//! See `DESIGN.md` for the architecture notes and known limitations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod event;
pub mod logging;
pub mod mattermost;
