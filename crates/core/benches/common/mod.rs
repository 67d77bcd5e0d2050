#![allow(dead_code)]

use std::env;
use std::time::Duration;

use criterion::measurement::Measurement;
use criterion::{BenchmarkGroup, Criterion, Throughput};

use vellum_core::geometry::{Point, Quad};
use vellum_core::layout::{Char, TextWord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchTier {
    Quick,
    Full,
}

impl BenchTier {
    pub fn from_env() -> Self {
        match env::var("VELLUM_BENCH_TIER").as_deref() {
            Ok("full") => Self::Full,
            _ => Self::Quick,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupWeight {
    Light,
    Heavy,
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub tier: BenchTier,
    pub seed: u64,
    pub sample_size_light: usize,
    pub sample_size_heavy: usize,
    pub measurement_light: Duration,
    pub measurement_heavy: Duration,
}

impl BenchConfig {
    /// Problem sizes for the current tier.
    pub fn sizes(&self) -> &'static [usize] {
        match self.tier {
            BenchTier::Quick => &[200, 2_000],
            BenchTier::Full => &[200, 2_000, 20_000],
        }
    }
}

pub fn bench_config() -> BenchConfig {
    let tier = BenchTier::from_env();
    let seed = env::var("VELLUM_BENCH_SEED")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0xC0FFEE);
    let (sample_size_light, sample_size_heavy, measurement_light, measurement_heavy) = match tier {
        BenchTier::Quick => (20, 12, Duration::from_secs(3), Duration::from_secs(5)),
        BenchTier::Full => (30, 20, Duration::from_secs(5), Duration::from_secs(10)),
    };

    BenchConfig {
        tier,
        seed,
        sample_size_light,
        sample_size_heavy,
        measurement_light,
        measurement_heavy,
    }
}

pub fn configure_group<M: Measurement>(
    group: &mut BenchmarkGroup<'_, M>,
    cfg: &BenchConfig,
    weight: GroupWeight,
) {
    match weight {
        GroupWeight::Light => {
            group.sample_size(cfg.sample_size_light);
            group.measurement_time(cfg.measurement_light);
        }
        GroupWeight::Heavy => {
            group.sample_size(cfg.sample_size_heavy);
            group.measurement_time(cfg.measurement_heavy);
        }
    }
}

pub type BenchCriterion = Criterion;

pub fn bench_criterion() -> BenchCriterion {
    Criterion::default().configure_from_args()
}

pub fn elements_throughput(n: usize) -> Throughput {
    Throughput::Elements(n as u64)
}

#[derive(Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    pub fn gen_f64(&mut self, min: f64, max: f64) -> f64 {
        let n = self.next_u64() as f64 / u64::MAX as f64;
        min + (max - min) * n
    }
}

/// Uniformly scattered points on a letter-size page.
pub fn scattered_points(seed: u64, count: usize) -> Vec<Point> {
    let mut rng = XorShift64::new(seed);
    (0..count)
        .map(|_| Point::new(rng.gen_f64(0.0, 612.0), rng.gen_f64(0.0, 792.0)))
        .collect()
}

/// Letters laid out in three jittered columns of short lines.
pub fn column_letters(seed: u64, count: usize) -> Vec<Char> {
    let mut rng = XorShift64::new(seed);
    let mut chars = Vec::with_capacity(count);
    let per_line = 40;
    for i in 0..count {
        let line = i / per_line;
        let col = (line % 3) as f64;
        let row = (line / 3) as f64;
        let x = 36.0 + col * 190.0 + (i % per_line) as f64 * 4.5 + rng.gen_f64(0.0, 0.2);
        let y = 760.0 - (row * 12.0) % 720.0;
        let rune = if i % 6 == 5 { ' ' } else { 'e' };
        chars.push(Char::new(
            rune,
            Quad::from_ltrb(x, y - 2.0, x + 4.5, y + 7.0),
            Point::new(x, y),
            Point::new(x + 4.5, y),
        ));
    }
    chars
}

/// Five-letter words in lines of eight, paragraphs of six lines.
pub fn paragraph_words(seed: u64, count: usize) -> Vec<TextWord> {
    let mut rng = XorShift64::new(seed);
    (0..count)
        .map(|i| {
            let line = i / 8;
            let para = line / 6;
            let x = 40.0 + (i % 8) as f64 * 34.0 + rng.gen_f64(0.0, 1.0);
            let y = 750.0 - ((line * 12 + para * 18) % 720) as f64;
            let chars = (0..5)
                .map(|k| {
                    let cx = x + k as f64 * 5.0;
                    Char::new(
                        'o',
                        Quad::from_ltrb(cx, y - 2.0, cx + 5.0, y + 8.0),
                        Point::new(cx, y),
                        Point::new(cx + 5.0, y),
                    )
                })
                .collect();
            TextWord::new(chars)
        })
        .collect()
}
