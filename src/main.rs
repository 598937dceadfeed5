#![deny(rust_2018_idioms)]

mod scenarios;

use scenarios::{Error, Scenario};
use std::time::Duration;
use sync245::{Context, DeviceDescriptor, SessionConfig};

/// Test harness for an FPGA connected through an FTDI chip in synchronous 245-FIFO mode.
#[derive(argh::FromArgs)]
struct Arguments {
    /// device to try, as KIND:NAME (e.g. "FT60X:FTDI SuperSpeed-FIFO Bridge"). May be repeated;
    /// candidates are tried in order. Defaults to an FT232H and an FT60X with factory names.
    #[argh(option, short = 'd')]
    device: Vec<DeviceDescriptor>,

    /// receive timeout in milliseconds.
    #[argh(option, default = "2000")]
    recv_timeout: u64,

    /// send timeout in milliseconds.
    #[argh(option, default = "2000")]
    send_timeout: u64,

    #[argh(subcommand)]
    scenario: Scenario,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = argh::from_env::<Arguments>();
    if let Err(err) = run(args) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run(args: Arguments) -> Result<(), Error> {
    let candidates = if args.device.is_empty() {
        DeviceDescriptor::defaults()
    } else {
        args.device
    };
    let config = SessionConfig::default()
        .with_recv_timeout(Duration::from_millis(args.recv_timeout))
        .with_send_timeout(Duration::from_millis(args.send_timeout));

    let mut context = Context::new()?;
    let mut session = context.open(&candidates, config)?;
    println!(
        "device opened: device_type={}, device_name={}",
        session.kind(),
        session.product_name()
    );

    let result = args.scenario.run(&mut session);
    session.close()?;
    result
}
