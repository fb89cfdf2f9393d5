//! Generate a synthetic similarity dataset in the production CSV layout
//!
//! Useful for local development and load testing when the real registry
//! extract is unavailable. Distributions are rough: most pairs sit in the
//! high-similarity band, ownership matches about two thirds of the time.
//!
//! Usage:
//!   cargo run --release --bin generate_sample_dataset [rows] [output.csv] [seed]

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use registry_similarity::domain::{Category, SizeClass, State, Status};
use std::path::PathBuf;
use std::time::Instant;

const MUNICIPALITIES_PER_STATE: usize = 12;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let rows: usize = args.next().map(|v| v.parse()).transpose()?.unwrap_or(100_000);
    let output = PathBuf::from(args.next().unwrap_or_else(|| "data/sample_similarity.csv".to_string()));
    let seed: u64 = args.next().map(|v| v.parse()).transpose()?.unwrap_or(42);

    println!("Generating {} rows (seed {}) -> {}", rows, seed, output.display());
    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut codes = Vec::with_capacity(rows);
    let mut regions = Vec::with_capacity(rows);
    let mut states = Vec::with_capacity(rows);
    let mut municipalities = Vec::with_capacity(rows);
    let mut sizes = Vec::with_capacity(rows);
    let mut statuses = Vec::with_capacity(rows);
    let mut dates = Vec::with_capacity(rows);
    let mut declared = Vec::with_capacity(rows);
    let mut aggregated = Vec::with_capacity(rows);
    let mut jaccard = Vec::with_capacity(rows);
    let mut ownership = Vec::with_capacity(rows);

    for i in 0..rows {
        let state = State::ALL[rng.gen_range(0..State::ALL.len())];
        let municipality = rng.gen_range(0..MUNICIPALITIES_PER_STATE);
        let size = SizeClass::ALL[weighted(&mut rng, &[0.7, 0.2, 0.1])];
        let status = Status::ALL[weighted(&mut rng, &[0.8, 0.12, 0.05, 0.03])];

        let similarity: f64 = match weighted(&mut rng, &[0.08, 0.1, 0.22, 0.6]) {
            0 => rng.gen_range(0.0..0.25),
            1 => rng.gen_range(0.25..0.5),
            2 => rng.gen_range(0.5..0.85),
            _ => rng.gen_range(0.85..=1.0),
        };

        let area: f64 = match size {
            SizeClass::Small => rng.gen_range(1.0..400.0),
            SizeClass::Medium => rng.gen_range(400.0..1500.0),
            SizeClass::Large => rng.gen_range(1500.0..20000.0),
        };
        // Aggregated area drifts further from the declared one as similarity drops
        let drift = rng.gen_range(-1.0..1.0f64) * (1.0 - similarity) * 0.8;

        codes.push(format!("{}-{:07}-{:08X}", state.code(), municipality * 1000 + i % 1000, rng.gen::<u32>()));
        regions.push(state.region().name().to_string());
        states.push(state.code().to_string());
        municipalities.push(format!("Municipio {} {:02}", state.code(), municipality + 1));
        sizes.push(size.code().to_string());
        statuses.push(status.code().to_string());
        dates.push(format!(
            "{}-{:02}-{:02}",
            rng.gen_range(2014..=2024),
            rng.gen_range(1..=12),
            rng.gen_range(1..=28)
        ));
        declared.push(round2(area));
        aggregated.push(round2(area * (1.0 + drift)));
        jaccard.push(round4(similarity));
        ownership.push(rng.gen_bool(0.65));
    }

    let mut df = df![
        "cod_imovel" => codes,
        "regiao" => regions,
        "estado" => states,
        "municipio_nome" => municipalities,
        "class_tam_imovel" => sizes,
        "status_imovel" => statuses,
        "data_cadastro_imovel" => dates,
        "area_sicar_ha" => declared,
        "area_sigef_agregado_ha" => aggregated,
        "indice_jaccard" => jaccard,
        "igualdade_cpf" => ownership,
    ]?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(&output)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;

    println!("Done in {:?}", start.elapsed());
    Ok(())
}

/// Index drawn according to relative weights
fn weighted(rng: &mut StdRng, weights: &[f64]) -> usize {
    let total: f64 = weights.iter().sum();
    let mut draw = rng.gen_range(0.0..total);
    for (i, w) in weights.iter().enumerate() {
        if draw < *w {
            return i;
        }
        draw -= w;
    }
    weights.len() - 1
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
