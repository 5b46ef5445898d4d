// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A simulated PCIe fabric switch that serves GFMS database dumps over an
//! in-process management channel.

pub mod config;
mod fabric;

pub use config::SimConfig;
pub use fabric::DumpKey;
pub use fabric::ExchangeRecord;
pub use fabric::SimulatedFabric;
pub use fabric::ERR_BAD_REQUEST;
pub use fabric::ERR_NO_DUMP;

use config::LogConfig;
use slog::o;
use slog::Drain;
use slog::Level;
use slog::Logger;

/// Build a terminal logger filtered to the configured level.
pub fn logger(config: &LogConfig) -> Logger {
    const NAME: &str = "gfms-sim";

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let level_drain =
        slog::LevelFilter(drain, Level::from(config.level)).fuse();
    let async_drain = slog_async::Async::new(level_drain).build().fuse();
    Logger::root(async_drain, o!("component" => NAME))
}
