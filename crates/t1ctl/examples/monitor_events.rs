//! Follow the rig for a minute and print every supervisor event.
//!
//! Uses the Armbian wiring: tune on gpiochip0 line 17, acknowledgment input
//! on line 18, handshake synchronization, `rigctld` on the default port.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p t1ctl --example monitor_events
//! ```

use std::time::Duration;

use t1ctl::gpio::GpioController;
use t1ctl::rigctl::RigctldClient;
use t1ctl::tuner::{SignalingVariant, T1Signaler};
use t1ctl::watch::WatchBuilder;
use t1ctl::{LineSpec, SystemPacer, WatchEvent};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let lines = GpioController::new().acquire_tuner_lines(
        &LineSpec::output("gpiochip0", 17),
        &LineSpec::input("gpiochip0", 18),
    )?;
    let signaler = T1Signaler::from_lines(lines, SignalingVariant::handshake(), SystemPacer::new())?;

    let watcher = WatchBuilder::new()
        .source(Box::new(RigctldClient::new(t1ctl::rigctl::DEFAULT_ADDR)))
        .signaler(Box::new(signaler))
        .poll_interval(Duration::from_secs(2))
        .build()?;

    let mut events = watcher.subscribe();
    let cancel = CancellationToken::new();
    let run = tokio::spawn(watcher.run(cancel.clone()));

    let deadline = tokio::time::sleep(Duration::from_secs(60));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline, if !cancel.is_cancelled() => {
                cancel.cancel();
            }
            event = events.recv() => match event {
                Ok(WatchEvent::Stopped) | Err(_) => break,
                Ok(event) => println!("{event:?}"),
            },
        }
    }

    let summary = run.await??;
    println!("{summary:?}");
    Ok(())
}
