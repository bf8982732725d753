//! Read the rig's frequency once and print the T1 band code.
//!
//! Needs a running `rigctld`; no GPIO hardware is touched.
//!
//! # Usage
//!
//! ```sh
//! rigctld -m 2002 -r /dev/ttyACM0 &
//! cargo run -p t1ctl --example show_band -- 127.0.0.1:4532
//! ```

use t1ctl::rigctl::RigctldClient;
use t1ctl::{classify, format_freq_mhz};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| t1ctl::rigctl::DEFAULT_ADDR.to_string());

    let mut client = RigctldClient::new(&addr);
    let freq = client.try_query().await?;
    let band = classify(freq);

    println!(
        "{} MHz -> band {} (bits {}), {} attempt(s)",
        format_freq_mhz(freq),
        band,
        band.bit_string(),
        client.attempts_last_query()
    );
    Ok(())
}
