// SPDX-License-Identifier: GPL-3.0

//! Chain access for dotlink: a catalog of known networks, a connection manager with endpoint
//! fallback and live readers of chain state.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   connect / switch    ┌────────────────────┐
//! │   registry   │──────────────────────▶│ ConnectionManager  │
//! └──────────────┘                       │ (Connector → api)  │
//!                                        └─────────┬──────────┘
//!                                                  │ watch<ConnectionState>
//!                                                  ▼
//!                                        ┌────────────────────┐
//!                                        │  Reader<Query>     │
//!                                        │  balance, nonce,   │
//!                                        │  block, staking,   │
//!                                        │  events, chain info│
//!                                        └────────────────────┘
//! ```

pub mod api;
pub mod connection;
pub mod error;
pub mod explorer;
pub mod readers;
pub mod registry;
mod rpc;
mod strings;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::{ChainApi, Connector};
pub use connection::{Connection, ConnectionManager, ConnectionState, ConnectionStatus};
pub use error::{Error, ReadError, RpcClientError};
pub use explorer::{ExplorerKind, ExplorerLink, explorer_link, explorer_link_by_name};
pub use readers::{ReadState, ReadStatus, Reader, ReaderFactory};
pub use registry::NetworkDescriptor;
pub use rpc::{SubstrateRpcClient, SubxtConnector};
