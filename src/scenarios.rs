//! Exercises for the FPGA designs which loop data back, stream a requested amount of data, or
//! answer a block with its CRC.

use argh::FromArgs;
use crc_any::CRC;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Instant;
use sync245::transport::Backend;
use sync245::Session;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Device(#[from] sync245::Error),
    #[error("txdata and rxdata mismatch at byte {offset} ({sent} B sent, {received} B received)")]
    LoopbackMismatch {
        offset: usize,
        sent: usize,
        received: usize,
    },
    #[error("expect_len ({expected}) and rx_len ({received}) mismatch")]
    LengthMismatch { expected: usize, received: usize },
    #[error("tx_crc ({expected:08x}) and rx_crc ({received:08x}) mismatch")]
    CrcMismatch { expected: u32, received: u32 },
    #[error("expected a 4 byte CRC, received {0} B")]
    ShortCrc(usize),
}

#[derive(FromArgs)]
#[argh(subcommand)]
pub enum Scenario {
    Loopback(Loopback),
    LoopbackMass(LoopbackMass),
    RxMass(RxMass),
    TxCrc(TxCrc),
}

/// send 16 bytes and print what comes back.
#[derive(FromArgs)]
#[argh(subcommand, name = "loopback")]
pub struct Loopback {}

/// send random blocks and compare them with what the FPGA loops back.
#[derive(FromArgs)]
#[argh(subcommand, name = "loopback-mass")]
pub struct LoopbackMass {
    /// number of blocks.
    #[argh(option, default = "2000")]
    count: usize,
}

/// request random amounts of data from the FPGA and check their length.
#[derive(FromArgs)]
#[argh(subcommand, name = "rx-mass")]
pub struct RxMass {
    /// number of requests.
    #[argh(option, default = "50")]
    count: usize,
}

/// send 0xFF-terminated blocks and compare the CRC the FPGA returns.
#[derive(FromArgs)]
#[argh(subcommand, name = "tx-crc")]
pub struct TxCrc {
    /// number of blocks.
    #[argh(option, default = "50")]
    count: usize,
}

impl Scenario {
    pub fn run<B: Backend>(self, session: &mut Session<B>) -> Result<(), Error> {
        match self {
            Scenario::Loopback(_) => loopback(session),
            Scenario::LoopbackMass(args) => loopback_mass(session, args.count),
            Scenario::RxMass(args) => rx_mass(session, args.count),
            Scenario::TxCrc(args) => tx_crc(session, args.count),
        }
    }
}

fn loopback<B: Backend>(session: &mut Session<B>) -> Result<(), Error> {
    let sent = session.send(b"0123456789abcdef")?;
    println!("{} B sent", sent);

    // Ask for more than was sent, the receive ends once the FPGA has nothing left
    let data = session.recv(sent * 2)?;
    println!("recv {} B : {:?}", data.len(), String::from_utf8_lossy(&data));
    Ok(())
}

fn loopback_mass<B: Backend>(session: &mut Session<B>, count: usize) -> Result<(), Error> {
    let mut rng = rand::thread_rng();
    let mut total_len = 0;

    for i in 0..count {
        let tx_data = random_data(&mut rng, 1..=2000, 0xff);
        session.send(&tx_data)?;
        let rx_data = session.recv(tx_data.len())?;

        total_len += tx_data.len();
        if i % 100 == 0 {
            println!("[{}/{}]   total_len={}", i + 1, count, total_len);
        }

        if let Some(offset) = first_difference(&tx_data, &rx_data) {
            return Err(Error::LoopbackMismatch {
                offset,
                sent: tx_data.len(),
                received: rx_data.len(),
            });
        }
    }
    Ok(())
}

fn rx_mass<B: Backend>(session: &mut Session<B>, count: usize) -> Result<(), Error> {
    let mut rng = rand::thread_rng();
    let mut total_rx_len = 0;
    let start = Instant::now();

    for i in 0..count {
        let expect_len: u32 = rng.gen_range(1..=10_000_000);
        session.send(&expect_len.to_le_bytes())?;

        let rx_len = session.recv(expect_len as usize)?.len();
        total_rx_len += rx_len;
        println!(
            "[{}/{}]   rx_len={}   total_rx_len={}   data_rate={:.0} kB/s",
            i + 1,
            count,
            rx_len,
            total_rx_len,
            data_rate(total_rx_len, start)
        );

        if rx_len != expect_len as usize {
            return Err(Error::LengthMismatch {
                expected: expect_len as usize,
                received: rx_len,
            });
        }
    }
    Ok(())
}

fn tx_crc<B: Backend>(session: &mut Session<B>, count: usize) -> Result<(), Error> {
    let mut rng = rand::thread_rng();
    let blocks: Vec<(Vec<u8>, u32)> = crc_blocks(&mut rng, 2_000_000..=3_000_000)
        .into_iter()
        .map(|block| {
            let crc = block_crc(&block);
            (block, crc)
        })
        .collect();

    let mut total_tx_len = 0;
    let start = Instant::now();

    for i in 0..count {
        let (tx_data, tx_crc) = &blocks[rng.gen_range(0..blocks.len())];
        session.send(tx_data)?;

        let rx_data = session.recv(4)?;
        let rx_crc = match rx_data[..] {
            [b0, b1, b2, b3] => u32::from_le_bytes([b0, b1, b2, b3]),
            _ => return Err(Error::ShortCrc(rx_data.len())),
        };

        total_tx_len += tx_data.len();
        println!(
            "[{}/{}]   tx_len={}   crc={:08x}   total_tx_len={}   data_rate={:.0} kB/s",
            i + 1,
            count,
            tx_data.len(),
            rx_crc,
            total_tx_len,
            data_rate(total_tx_len, start)
        );

        if *tx_crc != rx_crc {
            return Err(Error::CrcMismatch {
                expected: *tx_crc,
                received: rx_crc,
            });
        }
    }
    Ok(())
}

/// Random bytes in `0..=max_byte`, with a random length out of `len`.
fn random_data<R: Rng>(rng: &mut R, len: RangeInclusive<usize>, max_byte: u8) -> Vec<u8> {
    let len = rng.gen_range(len);
    (0..len).map(|_| rng.gen_range(0..=max_byte)).collect()
}

/// Blocks for the CRC design. The FPGA answers with the CRC once it sees 0xFF, so every block ends
/// with exactly one 0xFF.
fn crc_blocks<R: Rng>(rng: &mut R, large: RangeInclusive<usize>) -> Vec<Vec<u8>> {
    let mut blocks = vec![
        Vec::new(),
        random_data(rng, 1..=1, 0xfe),
        random_data(rng, 2..=2, 0xfe),
    ];
    for _ in 0..3 {
        blocks.push(random_data(rng, large.clone(), 0xfe));
    }
    for block in &mut blocks {
        block.push(0xff);
    }
    blocks
}

/// CRC-32 as computed by the FPGA: the usual reflected polynomial, without the final inversion.
fn block_crc(data: &[u8]) -> u32 {
    let mut crc = CRC::create_crc(0x04c1_1db7, 32, 0xffff_ffff, 0, true);
    crc.digest(data);
    crc.get_crc() as u32
}

fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| if a.len() != b.len() { Some(a.len().min(b.len())) } else { None })
}

/// Throughput in kB/s since `start`.
fn data_rate(bytes: usize, start: Instant) -> f64 {
    bytes as f64 / (start.elapsed().as_secs_f64() + 0.001) / 1e3
}
