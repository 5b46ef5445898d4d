// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dumping the global fabric management database of a PCIe fabric switch.
//!
//! A switch only exposes its management channel through small, fixed-size
//! exchanges ([`CommandExchange`]). Large databases are pulled through a
//! multi-phase [`DumpSession`], reassembled into one blob, and decoded into
//! the record types of [`gfms_messages`]. [`FabricDevice`] ties these
//! together with one operation per kind of database.

mod config;
mod error;
mod exchange;
mod fabric;
mod reassembler;
mod session;

pub use config::DumpConfig;
pub use config::LoadError;
pub use config::PollConfig;
pub use error::DumpError;
pub use error::DumpPhase;
pub use exchange::CommandExchange;
pub use exchange::DeviceCapabilities;
pub use exchange::ExchangeError;
pub use fabric::FabricDevice;
pub use reassembler::Reassembler;
pub use session::Chunk;
pub use session::DumpProtocol;
pub use session::DumpSession;
pub use session::PagedProtocol;
pub use session::SessionState;
pub use session::Started;
pub use session::StatusReport;
pub use session::TopologyProtocol;

pub use gfms_messages;
