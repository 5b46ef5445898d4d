// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dumps retrieved in chunks of every size decode to the same records

use crate::common::*;
use gfms_messages::paged_phase;
use gfms_messages::topo_subcmd;
use gfms_messages::PagedChunkHeader;
use gfms_messages::Record;
use gfms_messages::TopoDumpDataRequest;
use gfms_messages::DWORD;
use gfms_sim::DumpKey;
use gfms_sim::SimConfig;
use gfms_sim::SimulatedFabric;
use proptest::collection::vec;
use test_strategy::proptest;
use test_strategy::Arbitrary;

/// The shape of a PAX database and the chunk size it is paged out with.
#[derive(Debug, Arbitrary)]
struct PagingInput {
    /// Sizes past the largest chunk a response can carry are clamped by
    /// the switch.
    #[strategy(1u32..=300)]
    chunk_dw: u32,
    #[strategy(0u8..4)]
    hvds: u8,
    /// Endpoint port shapes; see [`ep_port`].
    #[strategy(vec(0u8..6, 0..10))]
    shapes: Vec<u8>,
}

fn gets(sim: &SimulatedFabric) -> usize {
    sim.exchanges()
        .iter()
        .filter(|ex| ex.paged_phase() == Some(paged_phase::GET))
        .count()
}

#[proptest]
fn pax_database_is_independent_of_chunking(input: PagingInput) {
    let expected = pax_all(input.hvds, &input.shapes);
    let config = SimConfig { chunk_dw: input.chunk_dw, ..Default::default() };
    let mut sim = SimulatedFabric::new(&config, &log());
    sim.insert(DumpKey::PaxAll, &expected).unwrap();

    let mut device = device(sim);
    assert_eq!(device.pax_all().unwrap(), expected);

    let declared_dw = expected.to_bytes().unwrap().len() / DWORD;
    let chunk_dw = input
        .chunk_dw
        .min(PagedChunkHeader::MAX_DATA_DW) as usize;
    assert_eq!(gets(device.exchange()), declared_dw.div_ceil(chunk_dw));
}

#[test]
fn chunk_boundaries() {
    let expected = ep_port_section(3, 4);
    let declared_dw = expected.to_bytes().unwrap().len() / DWORD;
    assert!(declared_dw as u32 <= PagedChunkHeader::MAX_DATA_DW);

    // One dword at a time, the largest chunk a response can carry, and the
    // whole dump in one chunk.
    for (chunk_dw, expected_gets) in [
        (1, declared_dw),
        (PagedChunkHeader::MAX_DATA_DW, 1),
        (declared_dw as u32, 1),
    ] {
        let config = SimConfig { chunk_dw, ..Default::default() };
        let mut sim = SimulatedFabric::new(&config, &log());
        sim.insert(DumpKey::EpPort(3), &expected).unwrap();

        let mut device = device(sim);
        assert_eq!(device.ep_port(3).unwrap(), expected);
        assert_eq!(gets(device.exchange()), expected_gets);
    }
}

#[test]
fn topology_chunk_boundaries() {
    let expected = topology(40);
    let declared = expected.to_bytes().unwrap().len();

    for chunk_dw in [1, 7, (TopoDumpDataRequest::MAX_DATA_LEN / DWORD) as u32]
    {
        let config = SimConfig {
            chunk_dw,
            preparing_polls: 0,
            ..Default::default()
        };
        let mut sim = SimulatedFabric::new(&config, &log());
        sim.insert(DumpKey::Topology, &expected).unwrap();

        let mut device = device(sim);
        assert_eq!(device.topology_info().unwrap(), expected);

        let data_gets = device
            .exchange()
            .exchanges()
            .iter()
            .filter(|ex| ex.subcmd() == Some(topo_subcmd::DATA_GET))
            .count();
        let chunk = chunk_dw as usize * DWORD;
        assert_eq!(data_gets, declared.div_ceil(chunk));
    }
}

#[test]
fn empty_dump_pages_nothing() {
    let mut sim = SimulatedFabric::new(&SimConfig::default(), &log());
    sim.insert_raw(DumpKey::EpPort(1), bytes::Bytes::new());

    let mut device = device(sim);
    // The dump itself is retrieved without a single get; decoding an empty
    // blob then fails.
    assert!(device.ep_port(1).is_err());
    assert_eq!(gets(device.exchange()), 0);
    let finishes = device
        .exchange()
        .exchanges()
        .iter()
        .filter(|ex| ex.paged_phase() == Some(paged_phase::FINISH))
        .count();
    assert_eq!(finishes, 1);
}
