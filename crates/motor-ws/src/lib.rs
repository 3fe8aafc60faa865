//! Push-channel client for motor telemetry.
//!
//! Provides:
//! - A pure exponential backoff policy for reconnect delays
//! - An explicit connection state machine (Disconnected/Connecting/Connected/Reconnecting)
//! - Wire decoding of `newReading` / `newAlert` frames with ingestion-boundary validation
//! - A `ConnectionManager` that supervises the transport and reconnects on drop

pub mod backoff;
pub mod connection;
pub mod connector;
pub mod error;
pub mod message;
pub mod mock;
pub mod state;

pub use backoff::BackoffPolicy;
pub use connection::{ConnectionConfig, ConnectionManager};
pub use connector::{PushConnector, PushStream, WsConnector};
pub use error::{WsError, WsResult};
pub use message::{PushEvent, PushMessage};
pub use state::{ConnectionState, ConnectionStateMachine, ConnectionStatus};
