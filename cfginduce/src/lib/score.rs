//! Score how well a grammar accounts for a set of test sentences.
//!
//! Each sentence is given a coverage ratio in `[0, 1]`: the length of the longest part of it the
//! grammar can parse, divided by its length. What "part" means is chosen by [`ScoreMode`]. The
//! ratios are then combined into a precision (their mean, weighted by how probable each sentence
//! is under a set of [`Frequencies`]) and a dispersion (their population standard deviation).

use thiserror::Error;
use tracing::{debug, info};

use crate::{engine::Parser, stats::Frequencies};

/// The value added to every frequency when weighting sentences.
pub const DEFAULT_SMOOTHING: f64 = 1e-6;

/// Anything that can decide whether it accepts a sequence of terminals.
pub trait Recogniser {
    fn recognises(&self, terms: &[&str]) -> bool;
}

impl Recogniser for Parser {
    fn recognises(&self, terms: &[&str]) -> bool {
        self.accepts(terms)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScoreMode {
    /// Coverage is the longest prefix which parses.
    #[default]
    Fast,
    /// Coverage is the longest contiguous window which parses. Of equal-length windows, the
    /// leftmost is tried first.
    Exhaustive,
}

/// Where sentence weights come from.
#[derive(Clone, Copy, Debug, Default)]
pub enum WeightSource<'a> {
    /// The frequencies of the test sentences themselves.
    #[default]
    TestSet,
    /// The frequencies of some other corpus, typically the one the grammar was induced from.
    Corpus(&'a Frequencies),
}

#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    #[error("test sentence {index} is empty")]
    EmptySentence { index: usize },
    #[error("no test sentences")]
    EmptyTestSet,
    #[error("sentence weights sum to {0}")]
    DegenerateWeights(f64),
    #[error("smoothing must be finite and non-negative, not {0}")]
    InvalidSmoothing(f64),
}

#[derive(Clone, Copy, Debug)]
pub struct Scorer {
    mode: ScoreMode,
    smoothing: f64,
}

impl Scorer {
    pub fn new(mode: ScoreMode) -> Self {
        Scorer {
            mode,
            smoothing: DEFAULT_SMOOTHING,
        }
    }

    /// Set the value added to every frequency when weighting sentences. Defaults to
    /// [`DEFAULT_SMOOTHING`].
    pub fn smoothing(mut self, eps: f64) -> Self {
        self.smoothing = eps;
        self
    }

    /// Return the coverage ratio of `sentence`, or `None` if `sentence` is empty.
    pub fn coverage<R: Recogniser + ?Sized, S: AsRef<str>>(
        &self,
        r: &R,
        sentence: &[S],
    ) -> Option<f64> {
        let terms = sentence.iter().map(|t| t.as_ref()).collect::<Vec<_>>();
        let len = terms.len();
        if len == 0 {
            return None;
        }
        for i in (1..=len).rev() {
            let found = match self.mode {
                ScoreMode::Fast => r.recognises(&terms[..i]),
                ScoreMode::Exhaustive => terms.windows(i).any(|w| r.recognises(w)),
            };
            if found {
                return Some(i as f64 / len as f64);
            }
        }
        Some(0.0)
    }

    /// Check `sentences` and compute their weights, returning a lazy scoring run which yields one
    /// [`ScoreProgress`] per sentence. All errors are detected here, before any parsing is done.
    pub fn start<'a, R: Recogniser + ?Sized, S: AsRef<str>>(
        &self,
        r: &'a R,
        sentences: &'a [Vec<S>],
        weights: WeightSource<'_>,
    ) -> Result<Scoring<'a, R, S>, ScoreError> {
        if !(self.smoothing.is_finite() && self.smoothing >= 0.0) {
            return Err(ScoreError::InvalidSmoothing(self.smoothing));
        }
        if sentences.is_empty() {
            return Err(ScoreError::EmptyTestSet);
        }
        if let Some(index) = sentences.iter().position(|s| s.is_empty()) {
            return Err(ScoreError::EmptySentence { index });
        }
        let test_freqs;
        let freqs = match weights {
            WeightSource::TestSet => {
                test_freqs = Frequencies::from_sentences(sentences);
                &test_freqs
            }
            WeightSource::Corpus(f) => f,
        };
        let weights = sentences
            .iter()
            .map(|s| freqs.weight(s, self.smoothing))
            .collect::<Vec<_>>();
        let sum = weights.iter().sum::<f64>();
        if !(sum.is_finite() && sum > 0.0) {
            return Err(ScoreError::DegenerateWeights(sum));
        }
        Ok(Scoring {
            scorer: *self,
            recogniser: r,
            sentences,
            weights,
            coverages: Vec::with_capacity(sentences.len()),
        })
    }

    /// Score every sentence in `sentences`.
    pub fn evaluate<R: Recogniser + ?Sized, S: AsRef<str>>(
        &self,
        r: &R,
        sentences: &[Vec<S>],
        weights: WeightSource<'_>,
    ) -> Result<Evaluation, ScoreError> {
        Ok(self.start(r, sentences, weights)?.finish())
    }
}

/// The coverage of one test sentence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreProgress {
    pub index: usize,
    pub coverage: f64,
    /// The fraction of the test set scored so far.
    pub progression: f64,
}

/// A scoring run in progress. Sentences are only parsed as the run is iterated over; it can be
/// stopped at any point and resumed later, or completed with [`Scoring::finish`].
pub struct Scoring<'a, R: ?Sized, S> {
    scorer: Scorer,
    recogniser: &'a R,
    sentences: &'a [Vec<S>],
    weights: Vec<f64>,
    coverages: Vec<f64>,
}

impl<R: Recogniser + ?Sized, S: AsRef<str>> Scoring<'_, R, S> {
    /// Score any remaining sentences and combine the results.
    pub fn finish(mut self) -> Evaluation {
        for _ in self.by_ref() {}
        let n = self.coverages.len() as f64;
        let precision = self
            .coverages
            .iter()
            .zip(&self.weights)
            .map(|(c, w)| c * w)
            .sum::<f64>()
            / self.weights.iter().sum::<f64>();
        let mean = self.coverages.iter().sum::<f64>() / n;
        let dispersion = (self
            .coverages
            .iter()
            .map(|c| (c - mean) * (c - mean))
            .sum::<f64>()
            / n)
            .sqrt();
        let full = self.coverages.iter().filter(|&&c| c >= 1.0).count();
        let partial = self
            .coverages
            .iter()
            .filter(|&&c| (0.5..1.0).contains(&c))
            .count();
        let poor = self.coverages.len() - full - partial;
        info!(
            sentences = self.coverages.len(),
            precision,
            dispersion,
            full,
            partial,
            poor,
            "evaluation finished"
        );
        Evaluation {
            precision,
            dispersion,
            full,
            partial,
            poor,
            coverages: self.coverages,
            weights: self.weights,
        }
    }
}

impl<R: Recogniser + ?Sized, S: AsRef<str>> Iterator for Scoring<'_, R, S> {
    type Item = ScoreProgress;

    fn next(&mut self) -> Option<ScoreProgress> {
        let index = self.coverages.len();
        let sentence = self.sentences.get(index)?;
        // Sentences were checked to be non-empty when the run was started.
        let coverage = self
            .scorer
            .coverage(self.recogniser, sentence)
            .unwrap_or(0.0);
        self.coverages.push(coverage);
        debug!(index, coverage, "scored sentence");
        Some(ScoreProgress {
            index,
            coverage,
            progression: self.coverages.len() as f64 / self.sentences.len() as f64,
        })
    }
}

/// The result of scoring a test set.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// The weighted mean of the coverage ratios.
    pub precision: f64,
    /// The population standard deviation of the (unweighted) coverage ratios.
    pub dispersion: f64,
    /// How many sentences parsed in full?
    pub full: usize,
    /// How many sentences had a coverage ratio in `[0.5, 1)`?
    pub partial: usize,
    /// How many sentences had a coverage ratio below 0.5?
    pub poor: usize,
    pub coverages: Vec<f64>,
    pub weights: Vec<f64>,
}
