//! Bishop client core: the remote backend, service routing, and the
//! dispatch loop that turns user input into backend calls and replies.

pub mod client;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod router;

pub use client::{FaithBackend, HttpBackend, ServiceReply, ServiceRequest};
pub use conversation::{Conversation, SendOutcome};
pub use dispatcher::{Applied, Completion, Dispatcher, APOLOGY};
pub use error::{ClientError, ClientResult};
pub use router::{route_tile, service_spec, ServiceSpec, ServiceTile, TileAction, SERVICE_SPECS, TILES};
