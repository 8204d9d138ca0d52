//! CemTem core library.
//!
//! Platform-independent conversation engine for cement and TMT bar price
//! inquiries: guided buyer, vendor and sales flows, vendor fan-out and quote
//! collection, and the storage and delivery ports transports plug into.
//!
//! A transport turns each message or button press into an
//! [`inbound::InboundEvent`] and hands it to [`router::Router::handle`].

pub mod config;
pub mod dispatch;
pub mod extract;
pub mod flow;
pub mod identity;
pub mod inbound;
pub mod location;
pub mod model;
pub mod outbound;
pub mod projects;
pub mod rates;
pub mod reply;
pub mod router;
pub mod session;
pub mod storage;

pub use config::Config;
pub use router::Router;
