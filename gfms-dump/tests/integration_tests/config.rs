// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loading dump and simulator configuration from files

use camino_tempfile::Utf8TempDir;
use gfms_dump::DeviceCapabilities;
use gfms_dump::DumpConfig;
use gfms_dump::LoadError;
use gfms_dump::PollConfig;
use gfms_sim::SimConfig;

#[test]
fn full_dump_config() {
    let dir = Utf8TempDir::new().unwrap();
    let path = dir.path().join("dump.toml");
    std::fs::write(
        &path,
        r#"
        max_blob_bytes = 4096
        release_on_error = false

        [status_poll]
        initial_interval_ms = 5
        max_interval_ms = 50
        max_polls = 10
        "#,
    )
    .unwrap();

    let config = DumpConfig::from_file(&path).unwrap();
    assert_eq!(
        config,
        DumpConfig {
            status_poll: PollConfig {
                initial_interval_ms: 5,
                max_interval_ms: 50,
                max_polls: Some(10),
            },
            max_blob_bytes: 4096,
            release_on_error: false,
        }
    );
}

#[test]
fn empty_dump_config_is_the_default() {
    let dir = Utf8TempDir::new().unwrap();
    let path = dir.path().join("dump.toml");
    std::fs::write(&path, "").unwrap();

    assert_eq!(DumpConfig::from_file(&path).unwrap(), DumpConfig::default());
}

#[test]
fn missing_dump_config() {
    let dir = Utf8TempDir::new().unwrap();
    let path = dir.path().join("nope.toml");

    match DumpConfig::from_file(&path).unwrap_err() {
        LoadError::Io { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_dump_config() {
    let dir = Utf8TempDir::new().unwrap();
    let path = dir.path().join("dump.toml");
    std::fs::write(&path, "max_blob_bytes = \"lots\"\n").unwrap();

    let err = DumpConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, LoadError::Parse { .. }), "{err}");
    assert!(err.to_string().contains(path.as_str()));
}

#[test]
fn simulator_config_drives_the_dump() {
    let dir = Utf8TempDir::new().unwrap();
    let path = dir.path().join("sim.toml");
    std::fs::write(
        &path,
        r#"
        capabilities = "GEN4"
        chunk_dw = 16
        "#,
    )
    .unwrap();

    let config = SimConfig::from_file(&path).unwrap();
    assert_eq!(config.capabilities, DeviceCapabilities::GEN4);
    assert_eq!(config.preparing_polls, 0);

    let mut device = crate::common::device(crate::common::populated_fabric(
        &config,
    ));
    assert!(device.topology_info().is_err());
    assert!(device.pax_all().is_ok());
}
