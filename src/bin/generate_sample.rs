use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

/// Sensor columns with their normal operating range.
const SENSORS: [(&str, f64, f64); 16] = [
    ("aa_000", 2.0, 2.5),
    ("ab_001", 2.1, 2.6),
    ("ac_002", 1.8, 2.3),
    ("ad_003", 2.2, 2.7),
    ("ae_004", 1.9, 2.4),
    ("af_005", 2.0, 2.5),
    ("ag_005", 15.0, 25.0),
    ("ag_006", 1.9, 2.4),
    ("ah_007", 20.0, 30.0),
    ("ai_008", 18.0, 28.0),
    ("aj_009", 2.1, 2.6),
    ("ak_010", 1.8, 2.3),
    ("al_011", 2.0, 2.5),
    ("am_012", 2.2, 2.7),
    ("an_013", 1.9, 2.4),
    ("ao_014", 2.0, 2.5),
];

/// A fault class, its share of the faulty rows and the ranges its sensors read.
/// Flow (ag_005) and temperature (ah_007, ai_008) sensors get their own
/// ranges; every other sensor reads pressure in bar.
struct FaultPattern {
    label: &'static str,
    share: f64,
    pressure: (f64, f64),
    flow: (f64, f64),
    temperature: (f64, f64),
}

static FAULTS: [FaultPattern; 3] = [
    FaultPattern {
        label: "Fault Class 1",
        share: 0.40,
        pressure: (2.8, 4.2),
        flow: (30.0, 40.0),
        temperature: (33.0, 45.0),
    },
    FaultPattern {
        label: "Fault Class 2",
        share: 0.35,
        pressure: (0.3, 1.7),
        flow: (5.0, 15.0),
        temperature: (8.0, 20.0),
    },
    FaultPattern {
        label: "Fault Class 3",
        share: 0.25,
        pressure: (0.0, 0.1),
        flow: (0.0, 1.0),
        temperature: (0.0, 5.0),
    },
];

impl FaultPattern {
    fn range(&self, sensor: &str) -> (f64, f64) {
        match sensor {
            "ag_005" => self.flow,
            "ah_007" | "ai_008" => self.temperature,
            _ => self.pressure,
        }
    }
}

#[derive(Parser)]
#[command(name = "generate_sample")]
#[command(about = "Write a synthetic air-pressure-system sensor CSV")]
struct Args {
    /// Number of rows
    #[arg(long, default_value_t = 1000)]
    rows: usize,

    /// Output path
    #[arg(long, default_value = "sample_sensor_data.csv")]
    output: PathBuf,

    /// PRNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Share of sensor cells written as `na`
    #[arg(long, default_value_t = 0.05)]
    na_rate: f64,

    /// Label faulty rows with their fault class instead of `pos`/`neg`
    #[arg(long)]
    fault_classes: bool,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, (lo, hi): (f64, f64)) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Fisher–Yates shuffle.
    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next_u64() % (i as u64 + 1)) as usize;
            items.swap(i, j);
        }
    }
}

/// Row labels: 80 % normal, the rest split across the fault patterns.
fn labels(rows: usize) -> Vec<Option<&'static FaultPattern>> {
    let normal = rows * 4 / 5;
    let faulty = rows - normal;
    let mut out: Vec<Option<&'static FaultPattern>> = vec![None; normal];
    let mut assigned = 0;
    for (i, pattern) in FAULTS.iter().enumerate() {
        let n = if i + 1 == FAULTS.len() {
            faulty - assigned
        } else {
            (faulty as f64 * pattern.share) as usize
        };
        out.extend(std::iter::repeat(Some(pattern)).take(n));
        assigned += n;
    }
    out
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let mut rows = labels(args.rows);
    rng.shuffle(&mut rows);

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let mut header: Vec<&str> = SENSORS.iter().map(|(name, _, _)| *name).collect();
    header.push("class");
    writer.write_record(&header)?;

    let mut faulty = 0;
    for fault in &rows {
        let mut record: Vec<String> = SENSORS
            .iter()
            .map(|&(name, lo, hi)| {
                if rng.next_f64() < args.na_rate {
                    return "na".to_string();
                }
                let range = fault.map_or((lo, hi), |p| p.range(name));
                format!("{:.4}", rng.uniform(range))
            })
            .collect();

        let label = match (fault, args.fault_classes) {
            (None, false) => "neg",
            (Some(_), false) => "pos",
            (None, true) => "Normal",
            (Some(p), true) => p.label,
        };
        faulty += usize::from(fault.is_some());
        record.push(label.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!("seed {}, na rate {}", args.seed, args.na_rate);
    println!(
        "Wrote {} rows ({faulty} faulty, {} sensors) to {}",
        rows.len(),
        SENSORS.len(),
        args.output.display()
    );
    Ok(())
}
