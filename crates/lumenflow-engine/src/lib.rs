//! LumenFlow Engine - Art-Net Discovery and Output Distribution
//!
//! The live half of the LumenFlow Art-Net stack:
//! - **Discovery**: periodic jittered ArtPoll broadcasts, poll-reply
//!   parsing into a node table, staleness eviction, and answering other
//!   controllers' polls
//! - **Output distribution**: one retransmission loop per locally-owned
//!   port address, feeding every currently subscribed node with sequenced
//!   ArtDmx frames
//! - **Input**: decoded channel data addressed to a registered port is
//!   handed to the host application's callback
//!
//! Everything runs on tokio: one receive loop, one poll loop, one sweep
//! trigger per poll cycle, and one retransmission task per actively-sending
//! port. Shared state sits behind a mutex that is never held across an
//! await.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lumenflow_engine::{ArtNetEngine, EngineConfig};
//! use lumenflow_proto::PortAddress;
//!
//! # async fn run() -> lumenflow_engine::Result<()> {
//! let engine = ArtNetEngine::bind(EngineConfig::default()).await?;
//! engine.on_dmx(|address, data| {
//!     println!("{}: {} channels", address, data.len());
//! });
//! engine.start();
//!
//! let address = PortAddress::try_new(0, 0, 1)?;
//! engine.register_port(address)?;
//! # Ok(())
//! # }
//! ```

/// Engine configuration
pub mod config;
/// Discovery loop and inbound dispatch
mod discovery;
/// The engine core and collaborator API
pub mod engine;
/// Error types
pub mod error;
/// Remote node bookkeeping
pub mod node;
/// Output distribution
pub mod output;
/// Socket plumbing
mod server;

pub use config::EngineConfig;
pub use engine::{ArtNetEngine, DmxHandler, NodeEvent};
pub use error::{EngineError, Result};
pub use node::{Node, NodeId, NodeTable, UpsertOutcome};
pub use output::SendOutcome;
