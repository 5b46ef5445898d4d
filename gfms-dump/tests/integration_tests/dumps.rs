// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Every kind of dump, retrieved from a well-behaved switch

use crate::common::*;
use gfms_dump::DeviceCapabilities;
use gfms_dump::DumpError;
use gfms_messages::command;
use gfms_messages::gfms_subcmd;
use gfms_messages::paged_phase;
use gfms_messages::topo_subcmd;
use gfms_messages::EpPortKind;
use gfms_sim::DumpKey;
use gfms_sim::SimConfig;
use gfms_sim::SimulatedFabric;

#[test]
fn topology_info() {
    let config = SimConfig { preparing_polls: 3, ..Default::default() };
    let mut device = device(populated_fabric(&config));

    assert_eq!(device.topology_info().unwrap(), topology(12));

    let subcmds: Vec<_> = device
        .exchange()
        .exchanges()
        .iter()
        .inspect(|ex| assert_eq!(ex.command, command::TOPO_INFO_DUMP))
        .filter_map(|ex| ex.subcmd())
        .collect();
    assert_eq!(
        subcmds,
        [
            topo_subcmd::START,
            topo_subcmd::STATUS_GET,
            topo_subcmd::STATUS_GET,
            topo_subcmd::STATUS_GET,
            topo_subcmd::STATUS_GET,
            topo_subcmd::DATA_GET,
            topo_subcmd::FINISH,
        ]
    );
}

#[test]
fn topology_info_at_full_capacity() {
    let config = SimConfig { chunk_dw: 250, ..Default::default() };
    let mut sim = SimulatedFabric::new(&config, &log());
    let full = topology(gfms_messages::TopologyInfo::MAX_PORTS as u8);
    sim.insert(DumpKey::Topology, &full).unwrap();

    let mut device = device(sim);
    assert_eq!(device.topology_info().unwrap(), full);
    // 1592 bytes take two 1000-byte data responses.
    let data_gets = device
        .exchange()
        .exchanges()
        .iter()
        .filter(|ex| ex.subcmd() == Some(topo_subcmd::DATA_GET))
        .count();
    assert_eq!(data_gets, 2);
}

#[test]
fn topology_info_requires_gen4_pax() {
    for capabilities in [DeviceCapabilities::GEN4, DeviceCapabilities::PAX] {
        let config = SimConfig { capabilities, ..Default::default() };
        let mut device = device(populated_fabric(&config));

        let err = device.topology_info().unwrap_err();
        match err {
            DumpError::UnsupportedOperation { operation, required } => {
                assert_eq!(operation, "topology_info");
                assert_eq!(
                    required,
                    DeviceCapabilities::GEN4 | DeviceCapabilities::PAX
                );
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(device.exchange().exchanges().is_empty());
    }
}

#[test]
fn single_shot_sections() {
    let mut device = device(populated_fabric(&SimConfig::default()));

    assert_eq!(device.fabric_general().unwrap(), fabric_general());
    assert_eq!(device.pax_general().unwrap(), pax_general());
    assert_eq!(device.hvd(0).unwrap(), hvd(0));
    assert_eq!(device.hvd(1).unwrap(), hvd(1));

    let detail = device.hvd_detail(1).unwrap();
    assert_eq!(detail, hvd_detail(0x8000_0001));
    assert_eq!(detail.body.log_port_count(), 2);

    for ex in device.exchange().exchanges() {
        assert_eq!(ex.command, command::GFMS_DB_DUMP);
    }
}

#[test]
fn pax_database() {
    let mut device = device(populated_fabric(&SimConfig::default()));

    let pax = device.pax_all().unwrap();
    assert_eq!(pax, pax_all(3, &[3, 0, 1, 2, 5, 0]));

    let phases: Vec<_> = device
        .exchange()
        .exchanges()
        .iter()
        .filter_map(|ex| ex.paged_phase())
        .collect();
    assert_eq!(phases.first(), Some(&paged_phase::START));
    assert_eq!(phases.last(), Some(&paged_phase::FINISH));
    assert!(phases[1..phases.len() - 1]
        .iter()
        .all(|&phase| phase == paged_phase::GET));
}

#[test]
fn endpoint_ports() {
    let mut device = device(populated_fabric(&SimConfig::default()));

    let switch = device.ep_port(0).unwrap();
    assert_eq!(switch, ep_port_section(0, 3));
    match &switch.port.kind {
        EpPortKind::Switch(port) => assert_eq!(port.endpoints.len(), 1),
        other => panic!("expected a switch, got {other:?}"),
    }
    assert_eq!(device.ep_port(2).unwrap(), ep_port_section(2, 1));
    assert_eq!(device.ep_port(5).unwrap(), ep_port_section(5, 0));

    let start = device
        .exchange()
        .exchanges()
        .iter()
        .find(|ex| ex.paged_phase() == Some(paged_phase::START))
        .unwrap();
    assert_eq!(start.request[..2], [gfms_subcmd::EP_PORT, 0]);
}

#[test]
fn all_endpoint_ports_come_from_the_pax_database() {
    let mut device = device(populated_fabric(&SimConfig::default()));

    let ports = device.ep_port_all().unwrap();
    assert_eq!(ports, pax_all(3, &[3, 0, 1, 2, 5, 0]).ep_port_all);
    assert!(device
        .exchange()
        .exchanges()
        .iter()
        .all(|ex| ex.subcmd() == Some(gfms_subcmd::PAX_ALL)));
}

#[test]
fn p2p_bitmap_edges() {
    for bitmap in [0, 1 << 63, 0x0000_0001_0000_0000] {
        let mut sim = SimulatedFabric::new(&SimConfig::default(), &log());
        sim.insert(DumpKey::HvdDetail(0), &hvd_detail(bitmap)).unwrap();

        let detail = device(sim).hvd_detail(0).unwrap();
        assert_eq!(detail, hvd_detail(bitmap));
        assert_eq!(
            detail.body.log_port_count(),
            bitmap.count_ones() as usize
        );
    }
}
