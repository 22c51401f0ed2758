//! Scoring module
//!
//! Deterministic per-symbol ensemble scores computed on a worker pool

mod engine;
mod pool;
mod types;

pub use engine::{
    core_score, factor_vector, score_symbol, score_symbol_isolated, symbol_seed, SEED_MODULUS,
    WEIGHT_EPSILON,
};
pub use pool::{default_worker_count, PoolConfig, ScoringPool};
pub use types::{
    BatchReport, ScoreRequest, ScoreResult, ScoringError, SymbolFailure, Weights,
    DEFAULT_FREQUENCY_PARAM, DEFAULT_VECTOR_LENGTH, NEUTRAL_SCORE,
};
