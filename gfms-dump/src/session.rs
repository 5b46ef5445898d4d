// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Multi-phase retrieval of a dump too large for a single exchange.
//!
//! A dump is pulled in one session: the device is told to start, polled
//! until the dump is ready if it needs time to prepare it, asked for
//! successive chunks until the declared length has been retrieved, and
//! finally told to finish so it can release the dump. The two protocols
//! devices speak for this are implemented by [`TopologyProtocol`] and
//! [`PagedProtocol`]; [`DumpSession`] drives either one.

use crate::error::DumpPhase;
use crate::exchange::CommandExchange;
use crate::reassembler::Reassembler;
use crate::DumpConfig;
use crate::DumpError;
use backoff::backoff::Backoff;
use bytes::Bytes;
use gfms_messages::command;
use gfms_messages::gfms_subcmd;
use gfms_messages::paged_phase;
use gfms_messages::topo_subcmd;
use gfms_messages::Cursor;
use gfms_messages::DumpStatus;
use gfms_messages::PagedChunkHeader;
use gfms_messages::PagedDumpControl;
use gfms_messages::PagedDumpGet;
use gfms_messages::PagedDumpStart;
use gfms_messages::SerializedSize;
use gfms_messages::TopoDumpDataRequest;
use gfms_messages::TopoDumpStatus;
use gfms_messages::DWORD;
use gfms_messages::MRPC_MAX_DATA_LEN;
use serde::Serialize;
use slog::debug;
use slog::o;
use slog::trace;
use slog::warn;
use slog::Logger;

/// Outcome of starting a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Started {
    /// The device is preparing the dump and must be polled for its status.
    Preparing,
    /// The dump can be paged immediately.
    Ready { declared_dw: u32 },
}

/// A status poll response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    /// Raw status code; see [`DumpStatus`].
    pub status: u8,
    /// Length of the dump, valid once the status is ready.
    pub declared_dw: u32,
}

/// One chunk of a dump, as returned by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Offset the device reports for this chunk.
    pub offset_dw: u32,
    pub data: Bytes,
}

/// The device side of a dump session.
pub trait DumpProtocol {
    /// Name of the dump, used in logs.
    fn name(&self) -> &'static str;

    fn start<E: CommandExchange>(
        &self,
        exchange: &mut E,
    ) -> Result<Started, DumpError>;

    /// Poll a dump that is being prepared.
    ///
    /// Only called when [`DumpProtocol::start`] returned
    /// [`Started::Preparing`]; protocols that are ready as soon as they start
    /// have no status to report.
    fn status<E: CommandExchange>(
        &self,
        _exchange: &mut E,
    ) -> Result<StatusReport, DumpError> {
        Err(DumpError::UnsupportedSubcommand)
    }

    /// Fetch the chunk starting at `offset_dw`. `remaining_dw` is how much of
    /// the dump is still outstanding; the device may return less.
    fn get_chunk<E: CommandExchange>(
        &self,
        exchange: &mut E,
        offset_dw: u32,
        remaining_dw: u32,
    ) -> Result<Chunk, DumpError>;

    fn finish<E: CommandExchange>(
        &self,
        exchange: &mut E,
    ) -> Result<(), DumpError>;
}

/// Serialize `request` and exchange it for a response.
pub(crate) fn call<E, T>(
    exchange: &mut E,
    phase: DumpPhase,
    command: u32,
    request: &T,
    response: &mut [u8],
) -> Result<usize, DumpError>
where
    E: CommandExchange,
    T: Serialize + SerializedSize,
{
    // Requests are fixed-size structures far smaller than the channel's
    // maximum payload; serializing one into this buffer can't fail.
    let mut outgoing_buf = [0; MRPC_MAX_DATA_LEN];
    let n = gfms_messages::serialize(&mut outgoing_buf, request).unwrap();

    let len = exchange
        .exchange(command, &outgoing_buf[..n], response)
        .map_err(DumpError::transport(phase))?;
    if len > response.len() {
        return Err(DumpError::Transport {
            phase,
            err: crate::ExchangeError::ResponseTooLarge {
                len,
                capacity: response.len(),
            },
        });
    }
    Ok(len)
}

/// The topology dump protocol: the device prepares the dump after it is
/// started, and chunks are requested by byte offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologyProtocol;

impl DumpProtocol for TopologyProtocol {
    fn name(&self) -> &'static str {
        "topology info"
    }

    fn start<E: CommandExchange>(
        &self,
        exchange: &mut E,
    ) -> Result<Started, DumpError> {
        let mut status = [0; 1];
        call(
            exchange,
            DumpPhase::Start,
            command::TOPO_INFO_DUMP,
            &topo_subcmd::START,
            &mut status,
        )?;
        Ok(Started::Preparing)
    }

    fn status<E: CommandExchange>(
        &self,
        exchange: &mut E,
    ) -> Result<StatusReport, DumpError> {
        let mut response = [0; TopoDumpStatus::MAX_SIZE];
        let n = call(
            exchange,
            DumpPhase::Status,
            command::TOPO_INFO_DUMP,
            &topo_subcmd::STATUS_GET,
            &mut response,
        )?;
        let status: TopoDumpStatus =
            Cursor::new("topology dump status", &response[..n]).read()?;
        Ok(StatusReport {
            status: status.status,
            declared_dw: u32::from(status.data_len_dw),
        })
    }

    fn get_chunk<E: CommandExchange>(
        &self,
        exchange: &mut E,
        offset_dw: u32,
        remaining_dw: u32,
    ) -> Result<Chunk, DumpError> {
        let offset = offset_dw as usize * DWORD;
        let request = TopoDumpDataRequest {
            subcmd: topo_subcmd::DATA_GET,
            reserved: 0,
            offset: u16::try_from(offset).map_err(|_| {
                DumpError::CapacityExceeded {
                    declared: offset,
                    capacity: usize::from(u16::MAX),
                }
            })?,
        };
        let want = (remaining_dw as usize * DWORD)
            .min(TopoDumpDataRequest::MAX_DATA_LEN);
        let mut response = vec![0; TopoDumpStatus::MAX_SIZE + want];
        let n = call(
            exchange,
            DumpPhase::Get,
            command::TOPO_INFO_DUMP,
            &request,
            &mut response,
        )?;

        let mut cursor = Cursor::new("topology dump data", &response[..n]);
        let status: TopoDumpStatus = cursor.read()?;
        let data = cursor.take(usize::from(status.data_len_dw) * DWORD)?;
        // Topology responses don't echo the offset they were asked for.
        Ok(Chunk { offset_dw, data: Bytes::copy_from_slice(data) })
    }

    fn finish<E: CommandExchange>(
        &self,
        exchange: &mut E,
    ) -> Result<(), DumpError> {
        let mut status = [0; 1];
        call(
            exchange,
            DumpPhase::Finish,
            command::TOPO_INFO_DUMP,
            &topo_subcmd::FINISH,
            &mut status,
        )?;
        Ok(())
    }
}

/// The paged GFMS database protocol: the dump is ready as soon as it is
/// started, and chunks are requested by dword offset.
#[derive(Debug, Clone, Copy)]
pub struct PagedProtocol {
    subcmd: u8,
    selector: u8,
}

impl PagedProtocol {
    /// The complete database of the PAX switch.
    pub fn pax_all() -> Self {
        Self { subcmd: gfms_subcmd::PAX_ALL, selector: 0 }
    }

    /// The endpoint-port section of one physical port.
    pub fn ep_port(phy_pid: u8) -> Self {
        Self { subcmd: gfms_subcmd::EP_PORT, selector: phy_pid }
    }

    fn control(&self, phase: u32) -> PagedDumpControl {
        PagedDumpControl {
            subcmd: self.subcmd,
            selector: self.selector,
            reserved: 0,
            phase,
        }
    }
}

impl DumpProtocol for PagedProtocol {
    fn name(&self) -> &'static str {
        match self.subcmd {
            gfms_subcmd::EP_PORT => "endpoint port",
            _ => "pax database",
        }
    }

    fn start<E: CommandExchange>(
        &self,
        exchange: &mut E,
    ) -> Result<Started, DumpError> {
        let mut response = [0; PagedDumpStart::MAX_SIZE];
        let n = call(
            exchange,
            DumpPhase::Start,
            command::GFMS_DB_DUMP,
            &self.control(paged_phase::START),
            &mut response,
        )?;
        let start: PagedDumpStart =
            Cursor::new("paged dump start", &response[..n]).read()?;
        Ok(Started::Ready { declared_dw: start.dw_len })
    }

    fn get_chunk<E: CommandExchange>(
        &self,
        exchange: &mut E,
        offset_dw: u32,
        _remaining_dw: u32,
    ) -> Result<Chunk, DumpError> {
        let request = PagedDumpGet {
            control: self.control(paged_phase::GET),
            offset_dw,
        };
        let mut response = [0; MRPC_MAX_DATA_LEN];
        let n = call(
            exchange,
            DumpPhase::Get,
            command::GFMS_DB_DUMP,
            &request,
            &mut response,
        )?;

        let mut cursor = Cursor::new("paged dump data", &response[..n]);
        let header: PagedChunkHeader = cursor.read()?;
        let data = cursor.take(header.data_dw()? as usize * DWORD)?;
        Ok(Chunk {
            offset_dw: header.offset_dw,
            data: Bytes::copy_from_slice(data),
        })
    }

    fn finish<E: CommandExchange>(
        &self,
        exchange: &mut E,
    ) -> Result<(), DumpError> {
        // The finish phase releases whichever dump is in progress, so it
        // carries no port selector.
        let control = PagedDumpControl {
            selector: 0,
            ..self.control(paged_phase::FINISH)
        };
        call(
            exchange,
            DumpPhase::Finish,
            command::GFMS_DB_DUMP,
            &control,
            &mut [],
        )?;
        Ok(())
    }
}

/// Lifecycle of a [`DumpSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Started, waiting for the device to finish preparing the dump.
    Started,
    Ready,
    Paging,
    /// The whole dump was retrieved and the device told to release it.
    Finished,
    Failed,
}

/// A single retrieval of one dump from one device.
pub struct DumpSession<'a, E, P> {
    exchange: &'a mut E,
    protocol: P,
    config: &'a DumpConfig,
    capacity: usize,
    state: SessionState,
    log: Logger,
}

impl<'a, E: CommandExchange, P: DumpProtocol> DumpSession<'a, E, P> {
    /// Create a session that refuses dumps declaring more than `capacity`
    /// bytes.
    pub fn new(
        exchange: &'a mut E,
        protocol: P,
        capacity: usize,
        config: &'a DumpConfig,
        log: &Logger,
    ) -> Self {
        let log = log.new(o!("dump" => protocol.name()));
        Self {
            exchange,
            protocol,
            config,
            capacity,
            state: SessionState::Idle,
            log,
        }
    }

    /// Retrieve the dump, returning a blob of exactly its declared length.
    pub fn retrieve(mut self) -> Result<Bytes, DumpError> {
        match self.run() {
            Ok(blob) => Ok(blob),
            Err(err) => {
                let started = matches!(
                    self.state,
                    SessionState::Started
                        | SessionState::Ready
                        | SessionState::Paging
                );
                self.transition(SessionState::Failed);
                if started && self.config.release_on_error {
                    self.release(&err);
                }
                Err(err)
            }
        }
    }

    fn run(&mut self) -> Result<Bytes, DumpError> {
        let declared_dw = match self.protocol.start(&mut *self.exchange)? {
            Started::Ready { declared_dw } => declared_dw,
            Started::Preparing => {
                self.transition(SessionState::Started);
                self.poll()?
            }
        };
        self.transition(SessionState::Ready);

        let declared = declared_dw as usize * DWORD;
        debug!(self.log, "dump ready"; "declared" => declared);
        if declared > self.capacity {
            return Err(DumpError::CapacityExceeded {
                declared,
                capacity: self.capacity,
            });
        }

        self.transition(SessionState::Paging);
        let blob = self.page(declared_dw)?;

        self.transition(SessionState::Finished);
        self.protocol.finish(&mut *self.exchange)?;
        Ok(blob)
    }

    /// Wait for the device to prepare the dump, returning its length.
    fn poll(&mut self) -> Result<u32, DumpError> {
        let poll = &self.config.status_poll;
        let mut backoff = poll.policy();
        let mut polls = 0;

        loop {
            let report = self.protocol.status(&mut *self.exchange)?;
            match DumpStatus::try_from(report.status) {
                Ok(DumpStatus::Ready) => return Ok(report.declared_dw),
                Ok(DumpStatus::Preparing) => {
                    polls += 1;
                    if poll.max_polls.is_some_and(|max| polls >= max) {
                        return Err(DumpError::StatusPollExhausted { polls });
                    }
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or_else(|| poll.max_interval());
                    trace!(
                        self.log, "dump still being prepared";
                        "polls" => polls,
                        "delay" => ?delay,
                    );
                    std::thread::sleep(delay);
                }
                Ok(DumpStatus::WrongSubcommand) => {
                    return Err(DumpError::UnsupportedSubcommand);
                }
                Ok(DumpStatus::NotStarted | DumpStatus::Failed) | Err(_) => {
                    return Err(DumpError::DeviceFailed {
                        status: report.status,
                    });
                }
            }
        }
    }

    fn page(&mut self, declared_dw: u32) -> Result<Bytes, DumpError> {
        let mut blob = Reassembler::new(declared_dw);
        while !blob.is_complete() {
            let chunk = self.protocol.get_chunk(
                &mut *self.exchange,
                blob.offset_dw(),
                blob.remaining_dw(),
            )?;
            trace!(
                self.log, "received chunk";
                "offset_dw" => chunk.offset_dw,
                "len" => chunk.data.len(),
            );
            blob.push(chunk.offset_dw, &chunk.data)?;
            if chunk.data.is_empty() {
                break;
            }
        }
        Ok(blob.finish()?)
    }

    /// Best-effort finish of a session that failed part way through.
    fn release(&mut self, err: &DumpError) {
        debug!(self.log, "releasing failed dump"; "err" => %err);
        if let Err(finish_err) = self.protocol.finish(&mut *self.exchange) {
            warn!(
                self.log, "failed to release dump";
                "err" => %finish_err,
            );
        }
    }

    fn transition(&mut self, state: SessionState) {
        trace!(
            self.log, "dump session state change";
            "from" => ?self.state,
            "to" => ?state,
        );
        self.state = state;
    }
}
