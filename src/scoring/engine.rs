//! Deterministic per-symbol ensemble score
//!
//! A symbol's structural factors come from a phase sweep seeded by a hash
//! of its name. For factor `j` the phase is `θ = λ·(seed + j + 1)` with
//! `λ = ln(frequency_param)`; the point `9·cos θ + 16i·sin θ` gives a
//! magnitude `m`, and the factor is `|sin(m)·cos(θ)|`. The mean factor is
//! the core score, which is blended with the external signals.
//!
//! Everything here is pure: identical inputs give bit-identical outputs.

use super::types::{ScoreRequest, SymbolFailure};
use std::panic::{self, AssertUnwindSafe};

/// Modulus for the symbol seed
pub const SEED_MODULUS: i32 = 9973;

/// Real axis of the phase ellipse
const Z_REAL: f64 = 9.0;

/// Imaginary axis of the phase ellipse
const Z_IMAG: f64 = 16.0;

/// Floor for the weight denominator
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// Seed in `[1, SEED_MODULUS]` from the symbol's UTF-16 code units
pub fn symbol_seed(symbol: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in symbol.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    (hash % SEED_MODULUS).unsigned_abs() + 1
}

/// Structural factors for a seed
pub fn factor_vector(seed: u32, frequency_param: f64, length: usize) -> Vec<f64> {
    let lambda = frequency_param.ln();
    (0..length)
        .map(|j| {
            let phase = lambda * (f64::from(seed) + j as f64 + 1.0);
            let real = Z_REAL * phase.cos();
            let imag = Z_IMAG * phase.sin();
            let magnitude = (real * real + imag * imag).sqrt();
            (magnitude.sin() * phase.cos()).abs()
        })
        .collect()
}

/// Mean of the factors, clamped to [0, 1]
pub fn core_score(factors: &[f64]) -> f64 {
    if factors.is_empty() {
        return 0.0;
    }
    let mean = factors.iter().sum::<f64>() / factors.len() as f64;
    mean.clamp(0.0, 1.0)
}

fn signal(
    scores: &std::collections::HashMap<String, f64>,
    symbol: &str,
    name: &'static str,
) -> Result<f64, SymbolFailure> {
    match scores.get(symbol) {
        None => Ok(0.0),
        Some(v) if v.is_finite() => Ok(v.clamp(0.0, 1.0)),
        Some(v) => Err(SymbolFailure::NonFiniteSignal {
            signal: name,
            value: *v,
        }),
    }
}

/// Ensemble score for one symbol
pub fn score_symbol(symbol: &str, request: &ScoreRequest) -> Result<f64, SymbolFailure> {
    if symbol.trim().is_empty() {
        return Err(SymbolFailure::EmptySymbol);
    }

    let ai = signal(&request.ai_scores, symbol, "ai")?;
    let vigo = signal(&request.vigo_scores, symbol, "vigo")?;

    let seed = symbol_seed(symbol);
    let factors = factor_vector(seed, request.frequency_param, request.vector_length);
    let core = core_score(&factors);

    let w = &request.weights;
    let denominator = w.total().max(WEIGHT_EPSILON);
    let score = (w.core_weight * core + w.ai_weight * ai + w.vigo_weight * vigo) / denominator;

    if !score.is_finite() {
        return Err(SymbolFailure::NonFiniteScore);
    }
    Ok(score.clamp(0.0, 1.0))
}

/// Score one symbol, turning a panic into a failure
pub fn score_symbol_isolated(symbol: &str, request: &ScoreRequest) -> Result<f64, SymbolFailure> {
    panic::catch_unwind(AssertUnwindSafe(|| score_symbol(symbol, request))).unwrap_or_else(
        |payload| {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(SymbolFailure::Panicked(msg))
        },
    )
}
