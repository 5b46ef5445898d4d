// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::config::SimConfig;
use anyhow::Context;
use anyhow::Result;
use bytes::Bytes;
use gfms_dump::CommandExchange;
use gfms_dump::DeviceCapabilities;
use gfms_dump::ExchangeError;
use gfms_messages::command;
use gfms_messages::gfms_subcmd;
use gfms_messages::paged_phase;
use gfms_messages::topo_subcmd;
use gfms_messages::DumpStatus;
use gfms_messages::GfmsIndexedRequest;
use gfms_messages::PagedChunkHeader;
use gfms_messages::PagedDumpControl;
use gfms_messages::PagedDumpGet;
use gfms_messages::PagedDumpStart;
use gfms_messages::Record;
use gfms_messages::SerializedSize;
use gfms_messages::TopoDumpDataRequest;
use gfms_messages::TopoDumpStatus;
use gfms_messages::DWORD;
use serde::de::DeserializeOwned;
use serde::Serialize;
use slog::debug;
use slog::o;
use slog::trace;
use slog::warn;
use slog::Logger;
use std::collections::BTreeMap;

/// Return code for requests the switch can't make sense of.
pub const ERR_BAD_REQUEST: u32 = 0x1;
/// Return code for dumps the switch has nothing to serve for.
pub const ERR_NO_DUMP: u32 = 0x2;

/// Identifies one dump the simulated switch can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DumpKey {
    Topology,
    FabricGeneral,
    PaxGeneral,
    PaxAll,
    Hvd(u8),
    HvdDetail(u8),
    EpPort(u8),
}

/// One exchange issued against the simulated switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRecord {
    pub command: u32,
    pub request: Vec<u8>,
}

impl ExchangeRecord {
    pub fn subcmd(&self) -> Option<u8> {
        self.request.first().copied()
    }

    /// Phase of a paged GFMS dump request.
    pub fn paged_phase(&self) -> Option<u32> {
        if self.command != command::GFMS_DB_DUMP {
            return None;
        }
        let phase = self.request.get(4..8)?;
        Some(u32::from_le_bytes(phase.try_into().ok()?))
    }
}

/// A fabric switch serving canned dumps over a simulated management
/// channel.
pub struct SimulatedFabric {
    config: SimConfig,
    blobs: BTreeMap<DumpKey, Bytes>,
    /// Status polls left before the topology dump is ready; `None` until
    /// the dump is started.
    topology_polls: Option<u32>,
    paging: Option<DumpKey>,
    exchanges: Vec<ExchangeRecord>,
    log: Logger,
}

impl SimulatedFabric {
    pub fn new(config: &SimConfig, log: &Logger) -> Self {
        let log = log.new(o!("component" => "SimulatedFabric"));
        debug!(log, "simulated fabric switch created";
            "capabilities" => ?config.capabilities,
            "chunk_dw" => config.chunk_dw,
        );
        Self {
            config: config.clone(),
            blobs: BTreeMap::new(),
            topology_polls: None,
            paging: None,
            exchanges: Vec::new(),
            log,
        }
    }

    /// Serve `record` as the dump identified by `key`.
    pub fn insert<R: Record>(
        &mut self,
        key: DumpKey,
        record: &R,
    ) -> Result<()> {
        let blob = record
            .to_bytes()
            .with_context(|| format!("failed to encode {}", R::NAME))?;
        self.insert_raw(key, blob);
        Ok(())
    }

    /// Serve `blob` verbatim as the dump identified by `key`.
    pub fn insert_raw(&mut self, key: DumpKey, blob: Bytes) {
        self.blobs.insert(key, blob);
    }

    /// Every exchange issued so far, in order.
    pub fn exchanges(&self) -> &[ExchangeRecord] {
        &self.exchanges
    }

    fn blob(&self, key: DumpKey) -> Result<Bytes, ExchangeError> {
        self.blobs
            .get(&key)
            .cloned()
            .ok_or(ExchangeError::Device { code: ERR_NO_DUMP })
    }

    fn topology(
        &mut self,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, ExchangeError> {
        match request.first().copied() {
            Some(topo_subcmd::START) => {
                self.topology_polls = Some(self.config.preparing_polls);
                respond(response, &DumpStatus::PREPARING, &[])
            }
            Some(topo_subcmd::STATUS_GET) => {
                let status = self.topology_status()?;
                respond(response, &status, &[])
            }
            Some(topo_subcmd::DATA_GET) => {
                let req: TopoDumpDataRequest = parse(request)?;
                let blob = self.blob(DumpKey::Topology)?;
                let offset = usize::from(req.offset).min(blob.len());
                let room =
                    response.len().saturating_sub(TopoDumpStatus::MAX_SIZE);
                let len = (self.config.chunk_dw as usize * DWORD)
                    .min(TopoDumpDataRequest::MAX_DATA_LEN)
                    .min(room)
                    .min(blob.len() - offset);
                let len = len - len % DWORD;
                let status = TopoDumpStatus {
                    status: DumpStatus::READY,
                    reserved: 0,
                    data_len_dw: (len / DWORD) as u16,
                };
                respond(response, &status, &blob[offset..offset + len])
            }
            Some(topo_subcmd::FINISH) => {
                self.topology_polls = None;
                respond(response, &DumpStatus::READY, &[])
            }
            _ => {
                let status = TopoDumpStatus {
                    status: DumpStatus::WRONG_SUBCOMMAND,
                    reserved: 0,
                    data_len_dw: 0,
                };
                respond(response, &status, &[])
            }
        }
    }

    fn topology_status(&mut self) -> Result<TopoDumpStatus, ExchangeError> {
        let (status, data_len_dw) =
            if let Some(status) = self.config.faults.topology_status {
                (status, 0)
            } else {
                match self.topology_polls {
                    None => (DumpStatus::NOT_STARTED, 0),
                    Some(0) => {
                        let blob = self.blob(DumpKey::Topology)?;
                        let data_len_dw = u16::try_from(blob.len() / DWORD)
                            .map_err(|_| ExchangeError::Device {
                                code: ERR_NO_DUMP,
                            })?;
                        (DumpStatus::READY, data_len_dw)
                    }
                    Some(polls) => {
                        self.topology_polls = Some(polls - 1);
                        (DumpStatus::PREPARING, 0)
                    }
                }
            };
        Ok(TopoDumpStatus { status, reserved: 0, data_len_dw })
    }

    fn gfms(
        &mut self,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, ExchangeError> {
        match request.first().copied() {
            Some(gfms_subcmd::FABRIC) => {
                self.single_shot(DumpKey::FabricGeneral, response)
            }
            Some(gfms_subcmd::PAX) => {
                self.single_shot(DumpKey::PaxGeneral, response)
            }
            Some(gfms_subcmd::HVD) => {
                let req: GfmsIndexedRequest = parse(request)?;
                self.single_shot(DumpKey::Hvd(req.index), response)
            }
            Some(gfms_subcmd::HVD_DETAIL) => {
                let req: GfmsIndexedRequest = parse(request)?;
                self.single_shot(DumpKey::HvdDetail(req.index), response)
            }
            Some(gfms_subcmd::PAX_ALL | gfms_subcmd::EP_PORT) => {
                self.paged(request, response)
            }
            _ => Err(ExchangeError::Device { code: ERR_BAD_REQUEST }),
        }
    }

    /// Answer with a whole section, padding the rest of the response the way
    /// the switch leaves its response buffer.
    fn single_shot(
        &self,
        key: DumpKey,
        response: &mut [u8],
    ) -> Result<usize, ExchangeError> {
        let blob = self.blob(key)?;
        if blob.len() > response.len() {
            return Err(ExchangeError::ResponseTooLarge {
                len: blob.len(),
                capacity: response.len(),
            });
        }
        let (section, rest) = response.split_at_mut(blob.len());
        section.copy_from_slice(&blob);
        rest.fill(0);
        Ok(response.len())
    }

    fn paged(
        &mut self,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, ExchangeError> {
        let control: PagedDumpControl = parse(request)?;
        match control.phase {
            paged_phase::START => {
                let key = match control.subcmd {
                    gfms_subcmd::EP_PORT => DumpKey::EpPort(control.selector),
                    _ => DumpKey::PaxAll,
                };
                let blob = self.blob(key)?;
                self.paging = Some(key);
                let start = PagedDumpStart {
                    dw_len: (blob.len() / DWORD) as u32,
                    num_of_switch: 1,
                };
                respond(response, &start, &[])
            }
            paged_phase::GET => {
                let get: PagedDumpGet = parse(request)?;
                let key = self
                    .paging
                    .ok_or(ExchangeError::Device { code: ERR_BAD_REQUEST })?;
                let blob = self.blob(key)?;
                let offset = (get.offset_dw as usize * DWORD).min(blob.len());
                let room =
                    response.len().saturating_sub(PagedChunkHeader::MAX_SIZE);
                let data_dw = (self.config.chunk_dw as usize)
                    .min(PagedChunkHeader::MAX_DATA_DW as usize)
                    .min((blob.len() - offset) / DWORD)
                    .min(room / DWORD);
                let skew = self.config.faults.offset_skew_dw;
                let header = PagedChunkHeader {
                    offset_dw: get.offset_dw + skew,
                    size_dw: data_dw as u32 + PagedChunkHeader::OVERHEAD_DW,
                    reserved: 0,
                };
                let data = &blob[offset..offset + data_dw * DWORD];
                respond(response, &header, data)
            }
            paged_phase::FINISH => {
                self.paging = None;
                Ok(0)
            }
            _ => Err(ExchangeError::Device { code: ERR_BAD_REQUEST }),
        }
    }
}

impl CommandExchange for SimulatedFabric {
    fn capabilities(&self) -> DeviceCapabilities {
        self.config.capabilities
    }

    fn exchange(
        &mut self,
        command: u32,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, ExchangeError> {
        self.exchanges
            .push(ExchangeRecord { command, request: request.to_vec() });
        trace!(
            self.log, "exchange";
            "command" => command,
            "request" => ?request,
        );

        let faults = &self.config.faults;
        if faults.fail_exchange == Some(self.exchanges.len()) {
            warn!(self.log, "injecting exchange failure";
                "exchange" => self.exchanges.len(),
                "code" => faults.error_code,
            );
            return Err(ExchangeError::Device { code: faults.error_code });
        }

        match command {
            command::TOPO_INFO_DUMP => self.topology(request, response),
            command::GFMS_DB_DUMP => self.gfms(request, response),
            _ => Err(ExchangeError::Device { code: ERR_BAD_REQUEST }),
        }
    }
}

fn parse<T: DeserializeOwned>(request: &[u8]) -> Result<T, ExchangeError> {
    gfms_messages::deserialize::<T>(request)
        .map(|(value, _rest)| value)
        .map_err(|_| ExchangeError::Device { code: ERR_BAD_REQUEST })
}

/// Write `header` followed by `data` into `response`.
fn respond<T: Serialize + SerializedSize>(
    response: &mut [u8],
    header: &T,
    data: &[u8],
) -> Result<usize, ExchangeError> {
    let len = T::MAX_SIZE + data.len();
    if len > response.len() {
        return Err(ExchangeError::ResponseTooLarge {
            len,
            capacity: response.len(),
        });
    }
    let n = gfms_messages::serialize(response, header).map_err(|_| {
        ExchangeError::ResponseTooLarge { len, capacity: response.len() }
    })?;
    response[n..n + data.len()].copy_from_slice(data);
    Ok(n + data.len())
}
