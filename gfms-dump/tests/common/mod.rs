// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixtures shared by the integration tests

use gfms_dump::DumpConfig;
use gfms_dump::FabricDevice;
use gfms_dump::PollConfig;
use gfms_messages::AttachedEndpoint;
use gfms_messages::AttachedFunction;
use gfms_messages::BoundPort;
use gfms_messages::EpPort;
use gfms_messages::EpPortAll;
use gfms_messages::EpPortKind;
use gfms_messages::EpPortSection;
use gfms_messages::FabPortInfo;
use gfms_messages::FabricGeneral;
use gfms_messages::FabricGeneralBody;
use gfms_messages::Hvd;
use gfms_messages::HvdAll;
use gfms_messages::HvdBody;
use gfms_messages::HvdDetail;
use gfms_messages::HvdDetailBody;
use gfms_messages::InternalFunction;
use gfms_messages::LogPortP2p;
use gfms_messages::LogPortRegion;
use gfms_messages::PaxAll;
use gfms_messages::PaxGeneral;
use gfms_messages::PaxGeneralBody;
use gfms_messages::PaxInfo;
use gfms_messages::SectionInfo;
use gfms_messages::SwitchPort;
use gfms_messages::TopologyInfo;
use gfms_messages::VepRegion;
use gfms_sim::DumpKey;
use gfms_sim::SimConfig;
use gfms_sim::SimulatedFabric;
use slog::o;
use slog::Logger;

pub fn log() -> Logger {
    Logger::root(slog::Discard, o!())
}

/// Dump configuration that polls without sleeping.
pub fn dump_config() -> DumpConfig {
    DumpConfig {
        status_poll: PollConfig {
            initial_interval_ms: 0,
            max_interval_ms: 0,
            max_polls: Some(16),
        },
        ..Default::default()
    }
}

pub fn device(sim: SimulatedFabric) -> FabricDevice<SimulatedFabric> {
    FabricDevice::new(sim, dump_config(), &log())
}

fn section(section_class: u8) -> SectionInfo {
    SectionInfo { section_class, pax_idx: 1, swfw_version: 0x0203 }
}

pub fn topology(ports: u8) -> TopologyInfo {
    TopologyInfo {
        sw_idx: 1,
        stack_bif: [0x0404_0404; 7],
        route_port: [0xff; 16],
        port_bitmap: (1u64 << ports) - 1,
        ports: (0..ports)
            .map(|phys_port_id| FabPortInfo {
                phys_port_id,
                port_type: 1,
                port_cfg_width: 16,
                port_neg_width: 8,
                port_major_ltssm: 0x11,
                ..Default::default()
            })
            .collect(),
    }
}

pub fn fabric_general() -> FabricGeneral {
    let mut body = FabricGeneralBody { pax_idx: 1, ..Default::default() };
    body.pax_info[1] = PaxInfo {
        ep_number: 3,
        fab_port_number: 4,
        hvd_number: 2,
        reserved: 0,
    };
    FabricGeneral { section: section(0), body }
}

pub fn pax_general() -> PaxGeneral {
    PaxGeneral {
        section: section(1),
        body: PaxGeneralBody {
            pax_idx: 1,
            hvd_count: 2,
            phy_port_count: 6,
            ep_port_count: 4,
            fab_port_count: 2,
            phy_port_bitmap_low: 0x3f,
            ..Default::default()
        },
    }
}

pub fn hvd_body(hvd_inst_id: u8, ports: u8) -> HvdBody {
    HvdBody {
        hvd_inst_id,
        phy_pid: hvd_inst_id + 8,
        hfid: 0x100 + u16::from(hvd_inst_id),
        bound: (0..ports)
            .map(|log_pid| BoundPort {
                log_pid,
                bound: log_pid % 2,
                bound_pdfid: 0x200 + u16::from(log_pid),
            })
            .collect(),
    }
}

pub fn hvd(hvd_inst_id: u8) -> Hvd {
    Hvd { section: section(2), body: hvd_body(hvd_inst_id, 3) }
}

pub fn hvd_detail(p2p_enable_bitmap: u64) -> HvdDetail {
    let p2p = p2p_enable_bitmap.count_ones();
    HvdDetail {
        section: section(3),
        body: HvdDetailBody {
            hvd_inst_id: 1,
            phy_pid: 9,
            hfid: 0x101,
            usp_status: 1,
            vep_region: vec![
                VepRegion { vep_type: 1, vep_pid: 0, hfid: 0x300 },
                VepRegion { vep_type: 2, vep_pid: 1, hfid: 0x301 },
            ],
            usp_bdf: 0x0100,
            log_port_region: (0..3)
                .map(|log_pid| LogPortRegion {
                    log_pid,
                    bound: 1,
                    pdfid: 0x400 + u16::from(log_pid),
                    ..Default::default()
                })
                .collect(),
            log_port_p2p_enable_bitmap: p2p_enable_bitmap,
            log_port_p2p_bitmap: (0..p2p)
                .map(|i| LogPortP2p {
                    config_bitmap_low: i,
                    active_bitmap_low: i,
                    ..Default::default()
                })
                .collect(),
        },
    }
}

pub fn endpoint(dsn: u64, functions: u16) -> AttachedEndpoint {
    AttachedEndpoint {
        function_number: functions as u8,
        attached_dsn: dsn,
        functions: (0..functions)
            .map(|func_id| AttachedFunction {
                func_id,
                pdfid: 0x500 + func_id,
                vid: 0x1b96,
                did: 0x2500,
                device_class: 0x010802,
                ..Default::default()
            })
            .collect(),
    }
}

/// An endpoint port of the given shape: 0 is unpopulated, 1 a directly
/// attached endpoint, and anything larger a switch with `shape - 2`
/// endpoints behind it.
pub fn ep_port(phy_pid: u8, shape: u8) -> EpPort {
    let kind = match shape {
        0 => EpPortKind::Unpopulated,
        1 => EpPortKind::Endpoint(endpoint(u64::from(phy_pid), 2)),
        n => EpPortKind::Switch(SwitchPort {
            switch_dsn: 0x0a0b_0c0d_0000_0000 | u64::from(phy_pid),
            internal_functions: vec![InternalFunction {
                func_id: 0,
                pdfid: 0x600,
                device_class: 0x060400,
                ..Default::default()
            }],
            endpoints: (0..n - 2)
                .map(|i| endpoint(u64::from(i), 1 + u16::from(i)))
                .collect(),
        }),
    };
    EpPort { phy_pid, kind }
}

pub fn ep_port_section(phy_pid: u8, shape: u8) -> EpPortSection {
    EpPortSection { section: section(5), port: ep_port(phy_pid, shape) }
}

pub fn pax_all(hvds: u8, shapes: &[u8]) -> PaxAll {
    PaxAll {
        pax_general: pax_general(),
        hvd_all: HvdAll {
            section: section(4),
            hvds: (0..hvds).map(|id| hvd_body(id, id + 1)).collect(),
        },
        ep_port_all: EpPortAll {
            section: section(5),
            ports: shapes
                .iter()
                .enumerate()
                .map(|(phy_pid, &shape)| ep_port(phy_pid as u8, shape))
                .collect(),
        },
    }
}

/// A switch serving every kind of dump.
pub fn populated_fabric(config: &SimConfig) -> SimulatedFabric {
    let mut sim = SimulatedFabric::new(config, &log());
    sim.insert(DumpKey::Topology, &topology(12)).unwrap();
    sim.insert(DumpKey::FabricGeneral, &fabric_general()).unwrap();
    sim.insert(DumpKey::PaxGeneral, &pax_general()).unwrap();
    sim.insert(DumpKey::PaxAll, &pax_all(3, &[3, 0, 1, 2, 5, 0])).unwrap();
    sim.insert(DumpKey::Hvd(0), &hvd(0)).unwrap();
    sim.insert(DumpKey::Hvd(1), &hvd(1)).unwrap();
    sim.insert(DumpKey::HvdDetail(1), &hvd_detail(0x8000_0001)).unwrap();
    sim.insert(DumpKey::EpPort(0), &ep_port_section(0, 3)).unwrap();
    sim.insert(DumpKey::EpPort(2), &ep_port_section(2, 1)).unwrap();
    sim.insert(DumpKey::EpPort(5), &ep_port_section(5, 0)).unwrap();
    sim
}
