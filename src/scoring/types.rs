//! Scoring request and result types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Default frequency parameter (λ = ln 7919)
pub const DEFAULT_FREQUENCY_PARAM: f64 = 7919.0;

/// Default factor vector length
pub const DEFAULT_VECTOR_LENGTH: usize = 8;

/// Score substituted for a symbol that could not be scored
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Ensemble weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weights {
    /// Weight of the structural core score
    pub core_weight: f64,
    /// Weight of the AI signal
    pub ai_weight: f64,
    /// Weight of the secondary-strategy signal
    pub vigo_weight: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            core_weight: 0.50,
            ai_weight: 0.25,
            vigo_weight: 0.25,
        }
    }
}

impl Weights {
    /// Weights that use the core score only
    pub fn core_only() -> Self {
        Self {
            core_weight: 1.0,
            ai_weight: 0.0,
            vigo_weight: 0.0,
        }
    }

    /// Sum of all weights
    pub fn total(&self) -> f64 {
        self.core_weight + self.ai_weight + self.vigo_weight
    }

    /// Check every weight is finite and non-negative
    pub fn validate(&self) -> Result<(), ScoringError> {
        let all = [
            ("core", self.core_weight),
            ("ai", self.ai_weight),
            ("vigo", self.vigo_weight),
        ];
        for (name, w) in all {
            if !w.is_finite() || w < 0.0 {
                return Err(ScoringError::InvalidWeights(format!("{} weight = {}", name, w)));
            }
        }
        Ok(())
    }
}

/// A batch of symbols to score.
///
/// Immutable once handed to the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    /// Symbols in the order results are returned
    pub symbols: Vec<String>,
    /// Ensemble weights
    pub weights: Weights,
    /// AI signal per symbol, in [0, 1]
    #[serde(default)]
    pub ai_scores: HashMap<String, f64>,
    /// Secondary-strategy signal per symbol, in [0, 1]
    #[serde(default)]
    pub vigo_scores: HashMap<String, f64>,
    /// Frequency parameter; the phase step is its natural log
    pub frequency_param: f64,
    /// Number of structural factors per symbol
    pub vector_length: usize,
}

impl ScoreRequest {
    /// Request with default weights and parameters
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            weights: Weights::default(),
            ai_scores: HashMap::new(),
            vigo_scores: HashMap::new(),
            frequency_param: DEFAULT_FREQUENCY_PARAM,
            vector_length: DEFAULT_VECTOR_LENGTH,
        }
    }

    /// Set the ensemble weights
    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    /// Set the AI signal map
    pub fn with_ai_scores(mut self, scores: HashMap<String, f64>) -> Self {
        self.ai_scores = scores;
        self
    }

    /// Set the secondary-strategy signal map
    pub fn with_vigo_scores(mut self, scores: HashMap<String, f64>) -> Self {
        self.vigo_scores = scores;
        self
    }

    /// Set the frequency parameter
    pub fn with_frequency_param(mut self, frequency_param: f64) -> Self {
        self.frequency_param = frequency_param;
        self
    }

    /// Set the factor vector length
    pub fn with_vector_length(mut self, vector_length: usize) -> Self {
        self.vector_length = vector_length;
        self
    }

    /// Check request-wide parameters; per-symbol problems are handled later
    pub fn validate(&self) -> Result<(), ScoringError> {
        self.weights.validate()?;
        if !self.frequency_param.is_finite() || self.frequency_param <= 1.0 {
            return Err(ScoringError::InvalidFrequency(self.frequency_param));
        }
        if self.vector_length == 0 {
            return Err(ScoringError::InvalidVectorLength);
        }
        Ok(())
    }
}

/// Score for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Symbol
    pub symbol: String,
    /// Score in [0, 1]
    pub score: f64,
}

/// Outcome of a scoring batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Batch identifier
    pub batch_id: Uuid,
    /// Results in request order
    pub results: Vec<ScoreResult>,
    /// Symbols that received the neutral score
    pub failed_symbols: Vec<String>,
}

impl BatchReport {
    /// Number of symbols scored with the neutral fallback
    pub fn failures(&self) -> usize {
        self.failed_symbols.len()
    }

    /// Results keyed by symbol
    pub fn by_symbol(&self) -> HashMap<&str, f64> {
        self.results
            .iter()
            .map(|r| (r.symbol.as_str(), r.score))
            .collect()
    }

    /// Score for one symbol
    pub fn score(&self, symbol: &str) -> Option<f64> {
        self.results
            .iter()
            .find(|r| r.symbol == symbol)
            .map(|r| r.score)
    }
}

/// Request-level scoring errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScoringError {
    /// A weight is negative or not finite
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),
    /// Frequency parameter must be finite and greater than one
    #[error("Invalid frequency parameter: {0}")]
    InvalidFrequency(f64),
    /// Vector length must be at least one
    #[error("Vector length must be at least 1")]
    InvalidVectorLength,
    /// The pool has shut down
    #[error("Scoring pool is closed")]
    PoolClosed,
}

/// Why a single symbol could not be scored
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SymbolFailure {
    /// Symbol name is empty
    #[error("Empty symbol")]
    EmptySymbol,
    /// An external signal is NaN or infinite
    #[error("Non-finite {signal} signal: {value}")]
    NonFiniteSignal { signal: &'static str, value: f64 },
    /// The computation produced NaN or infinity
    #[error("Score is not finite")]
    NonFiniteScore,
    /// The computation panicked
    #[error("Scoring panicked: {0}")]
    Panicked(String),
}
