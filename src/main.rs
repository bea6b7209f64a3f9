use hoptx::device::SdrDriver;
use hoptx::{Lifecycle, RadioConfig};

use log::LevelFilter;
use std::io::Write;

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .format(|buf, record| {
            writeln!(
                buf,
                "{:<5} - {} - {}",
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .filter_level(LevelFilter::Warn)
        .filter_module("hoptx", LevelFilter::Info)
        .filter_module("rustradio", LevelFilter::Warn)
        .init();

    // Optional device selector, e.g. `null`, `file=out.iq` or `hackrf=<serial>`
    let mut config = RadioConfig::default();
    if let Some(device_args) = std::env::args().nth(1) {
        config.device_args = device_args;
    }

    // Any line on stdin (or stdin closing) requests shutdown
    let (stop_tx, stop_rx) = flume::bounded(1);
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = stop_tx.send(());
    });

    let stdout = std::io::stdout();
    Lifecycle::new(config)
        .with_stop_hint("Press Enter to stop")
        .run(&SdrDriver, stop_rx, &mut stdout.lock())?;

    Ok(())
}
