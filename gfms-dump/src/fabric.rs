// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::DumpPhase;
use crate::session::call;
use crate::session::DumpProtocol;
use crate::session::DumpSession;
use crate::session::PagedProtocol;
use crate::session::TopologyProtocol;
use crate::CommandExchange;
use crate::DeviceCapabilities;
use crate::DumpConfig;
use crate::DumpError;
use bytes::Bytes;
use gfms_messages::command;
use gfms_messages::gfms_subcmd;
use gfms_messages::EpPortAll;
use gfms_messages::EpPortSection;
use gfms_messages::FabricGeneral;
use gfms_messages::GfmsIndexedRequest;
use gfms_messages::Hvd;
use gfms_messages::HvdDetail;
use gfms_messages::PaxAll;
use gfms_messages::PaxGeneral;
use gfms_messages::Record;
use gfms_messages::SectionHeader;
use gfms_messages::TopologyInfo;
use gfms_messages::MRPC_MAX_DATA_LEN;
use serde::Serialize;
use slog::debug;
use slog::o;
use slog::Logger;

/// Handle for dumping the fabric database of one switch.
///
/// Every dump borrows the handle mutably, so dumps on one device never
/// interleave.
pub struct FabricDevice<E> {
    exchange: E,
    config: DumpConfig,
    log: Logger,
}

impl<E: CommandExchange> FabricDevice<E> {
    pub fn new(exchange: E, config: DumpConfig, log: &Logger) -> Self {
        let log = log.new(o!("component" => "FabricDevice"));
        Self { exchange, config, log }
    }

    pub fn config(&self) -> &DumpConfig {
        &self.config
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn into_inner(self) -> E {
        self.exchange
    }

    /// Dump the topology of the switch.
    ///
    /// Only gen4 PAX switches can report their topology; other devices are
    /// refused without being contacted.
    pub fn topology_info(&mut self) -> Result<TopologyInfo, DumpError> {
        let required = DeviceCapabilities::GEN4 | DeviceCapabilities::PAX;
        if !self.exchange.capabilities().contains(required) {
            return Err(DumpError::UnsupportedOperation {
                operation: "topology_info",
                required,
            });
        }
        let blob = self.retrieve(TopologyProtocol, TopologyInfo::CAPACITY)?;
        Ok(TopologyInfo::from_blob(&blob)?)
    }

    /// Dump the fabric-wide summary.
    pub fn fabric_general(&mut self) -> Result<FabricGeneral, DumpError> {
        self.single_shot(&gfms_subcmd::FABRIC)
    }

    /// Dump the general section of the PAX switch.
    pub fn pax_general(&mut self) -> Result<PaxGeneral, DumpError> {
        self.single_shot(&gfms_subcmd::PAX)
    }

    /// Dump the complete database of the PAX switch.
    pub fn pax_all(&mut self) -> Result<PaxAll, DumpError> {
        let capacity = self.config.max_blob_bytes;
        let blob = self.retrieve(PagedProtocol::pax_all(), capacity)?;
        Ok(PaxAll::from_blob(&blob)?)
    }

    /// Dump one host virtual domain and its bound logical ports.
    pub fn hvd(&mut self, hvd_idx: u8) -> Result<Hvd, DumpError> {
        self.single_shot(&GfmsIndexedRequest {
            subcmd: gfms_subcmd::HVD,
            index: hvd_idx,
        })
    }

    /// Dump the detailed state of one host virtual domain.
    pub fn hvd_detail(&mut self, hvd_idx: u8) -> Result<HvdDetail, DumpError> {
        self.single_shot(&GfmsIndexedRequest {
            subcmd: gfms_subcmd::HVD_DETAIL,
            index: hvd_idx,
        })
    }

    /// Dump what is attached to one physical port.
    pub fn ep_port(&mut self, phy_pid: u8) -> Result<EpPortSection, DumpError> {
        let blob = self.retrieve(
            PagedProtocol::ep_port(phy_pid),
            self.config.max_blob_bytes,
        )?;
        Ok(EpPortSection::from_blob(&blob)?)
    }

    /// Dump what is attached to every physical port.
    ///
    /// The device only serves the endpoint ports as part of the PAX
    /// database, so this retrieves the whole database and keeps its
    /// endpoint-port section.
    pub fn ep_port_all(&mut self) -> Result<EpPortAll, DumpError> {
        Ok(self.pax_all()?.ep_port_all)
    }

    fn retrieve<P: DumpProtocol>(
        &mut self,
        protocol: P,
        capacity: usize,
    ) -> Result<Bytes, DumpError> {
        DumpSession::new(
            &mut self.exchange,
            protocol,
            capacity,
            &self.config,
            &self.log,
        )
        .retrieve()
    }

    /// Dump a section that fits in a single response.
    fn single_shot<R, T>(&mut self, request: &T) -> Result<R, DumpError>
    where
        R: Record,
        T: Serialize + gfms_messages::SerializedSize,
    {
        let mut response = [0; MRPC_MAX_DATA_LEN];
        let n = call(
            &mut self.exchange,
            DumpPhase::Request,
            command::GFMS_DB_DUMP,
            request,
            &mut response,
        )?;
        let section = SectionHeader::bound(R::NAME, &response[..n])?;
        debug!(
            self.log, "received section";
            "section" => R::NAME,
            "len" => section.len(),
        );
        Ok(R::from_blob(section)?)
    }
}
