//! Deterministic synthetic bar and tick streams for smoke runs.
//!
//! Bars are an hourly random walk from 100.0 with a 14-bar mean-absolute-move
//! volatility column (absent during warm-up) and sparse random signals. Ticks
//! are scattered inside each bar's hour around its close. Both are seeded
//! from a BLAKE3 hash of the symbol, so a symbol always gets the same data.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tickfill_core::domain::{Bar, Signal, Tick};

const VOLATILITY_WINDOW: usize = 14;

fn rng_for(symbol: &str, stream: &str) -> StdRng {
    let seed = blake3::hash(format!("{symbol}/{stream}").as_bytes());
    StdRng::from_seed(*seed.as_bytes())
}

/// `count` hourly bars starting at `start`.
pub fn generate_synthetic_bars(symbol: &str, start: DateTime<Utc>, count: usize) -> Vec<Bar> {
    let mut rng = rng_for(symbol, "bars");
    let mut closes: Vec<f64> = Vec::with_capacity(count);
    let mut price = 100.0_f64;

    (0..count)
        .map(|i| {
            if i > 0 {
                price *= 1.0 + rng.gen_range(-0.02..0.02);
            }
            closes.push(price);

            let volatility = (i >= VOLATILITY_WINDOW).then(|| {
                let window = &closes[i - VOLATILITY_WINDOW..=i];
                window.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>()
                    / VOLATILITY_WINDOW as f64
            });

            let draw: f64 = rng.gen();
            let signal = if draw < 0.05 {
                Signal::Long
            } else if draw < 0.10 {
                Signal::Short
            } else {
                Signal::Flat
            };

            Bar {
                timestamp: start + Duration::hours(i as i64),
                close: price,
                signal,
                volatility,
            }
        })
        .collect()
}

/// `per_bar` ticks inside each bar's hour, sorted by time.
pub fn generate_synthetic_ticks(symbol: &str, bars: &[Bar], per_bar: usize) -> Vec<Tick> {
    let mut rng = rng_for(symbol, "ticks");
    let mut ticks = Vec::with_capacity(bars.len() * per_bar);
    for bar in bars {
        let mut offsets: Vec<i64> = (0..per_bar).map(|_| rng.gen_range(0..3_600_000)).collect();
        offsets.sort_unstable();
        for offset in offsets {
            ticks.push(Tick {
                timestamp: bar.timestamp + Duration::milliseconds(offset),
                price: bar.close * (1.0 + rng.gen_range(-0.001..0.001)),
                is_buyer_maker: rng.gen_bool(0.5),
                symbol: symbol.to_string(),
            });
        }
    }
    ticks
}
