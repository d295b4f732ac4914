//! Grammar induction by iterated n-gram compression.
//!
//! Each round counts every n-gram (of length `2..=max_order`) across the corpus, introduces a fresh
//! non-terminal `NT<k>` for the most frequent one, and rewrites every sentence with that n-gram
//! replaced by `NT<k>`. When no n-gram is frequent enough, the residual sentences become the
//! alternatives of the start rule `S`.
//!
//! Induction is exposed both as a single call ([`Inducer::induce`]) and as a lazy run
//! ([`Induction`]) which yields one [`InductionStep`] per round. A caller may stop pulling steps at
//! any point and later either resume or call [`Induction::finish`]: the result is the same.

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::{debug, info};
use vob::Vob;

use crate::{
    grammar::Grammar,
    symbol::{NtIdx, Symbol, Terminals},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InduceError {
    #[error("maximum n-gram order must be at least 2 (got {0})")]
    InvalidOrder(usize),
    #[error("minimum n-gram frequency must be at least 1")]
    InvalidMinFrequency,
}

/// The longest n-grams considered in each round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NgramOrder {
    /// n-grams of length `2..=n`.
    Bounded(usize),
    /// n-grams of any length up to that of the sentence they occur in.
    Unbounded,
}

impl NgramOrder {
    fn max_len(self, seq_len: usize) -> usize {
        match self {
            NgramOrder::Bounded(n) => n.min(seq_len),
            NgramOrder::Unbounded => seq_len,
        }
    }
}

/// Configures and starts grammar induction.
#[derive(Clone, Debug)]
pub struct Inducer {
    order: NgramOrder,
    min_frequency: usize,
}

impl Default for Inducer {
    fn default() -> Self {
        Inducer::new()
    }
}

impl Inducer {
    /// Create a new inducer considering bigrams only, and stopping as soon as no n-gram occurs
    /// more than once.
    pub fn new() -> Self {
        Inducer {
            order: NgramOrder::Bounded(2),
            min_frequency: 2,
        }
    }

    /// Set the longest n-gram considered in each round.
    pub fn max_order(mut self, order: NgramOrder) -> Self {
        self.order = order;
        self
    }

    /// Set the number of occurrences an n-gram needs before it is replaced by a non-terminal.
    /// With `1`, induction continues until every sentence is a single symbol.
    pub fn min_frequency(mut self, min_frequency: usize) -> Self {
        self.min_frequency = min_frequency;
        self
    }

    /// Start a lazy induction run over `sentences`. The caller's sentences are not modified;
    /// empty sentences are ignored.
    pub fn start<S: AsRef<str>>(&self, sentences: &[Vec<S>]) -> Result<Induction, InduceError> {
        if let NgramOrder::Bounded(n) = self.order {
            if n < 2 {
                return Err(InduceError::InvalidOrder(n));
            }
        }
        if self.min_frequency == 0 {
            return Err(InduceError::InvalidMinFrequency);
        }
        let mut terminals = Terminals::new();
        let sequences = sentences
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| terminals.intern_sequence(s))
            .collect();
        Ok(Induction {
            order: self.order,
            min_frequency: self.min_frequency,
            terminals,
            sequences,
            rules: Vec::new(),
            done: false,
        })
    }

    /// Induce a grammar from `sentences`.
    pub fn induce<S: AsRef<str>>(&self, sentences: &[Vec<S>]) -> Result<Grammar, InduceError> {
        Ok(self.start(sentences)?.finish())
    }
}

/// The record of one induction round.
#[derive(Clone, Debug, PartialEq)]
pub struct InductionStep {
    /// The non-terminal created in this round.
    pub nonterm: NtIdx,
    /// The n-gram `nonterm` stands for.
    pub ngram: Vec<Symbol>,
    /// How often `ngram` occurred before substitution.
    pub frequency: usize,
    /// The number of symbols in the corpus before substitution.
    pub remaining: usize,
    /// `sentences / remaining`: rises towards 1 as sentences are reduced to single symbols.
    pub progression: f64,
}

/// An in-progress induction run. Each call to `next` performs one round.
#[derive(Debug)]
pub struct Induction {
    order: NgramOrder,
    min_frequency: usize,
    terminals: Terminals,
    sequences: Vec<Vec<Symbol>>,
    /// Rules in creation order: `rules[k - 1]` defines `NT<k>`.
    rules: Vec<(NtIdx, Vec<Symbol>)>,
    done: bool,
}

impl Induction {
    /// The terminal table of this run.
    pub fn terminals(&self) -> &Terminals {
        &self.terminals
    }

    /// The working sentences as rewritten by the rounds performed so far.
    pub fn sequences(&self) -> &[Vec<Symbol>] {
        &self.sequences
    }

    /// How many non-terminals have been created so far.
    pub fn nonterms_len(&self) -> usize {
        self.rules.len()
    }

    /// Run any remaining rounds and build the final grammar.
    pub fn finish(mut self) -> Grammar {
        while self.next().is_some() {}
        let mut start: Vec<Vec<Symbol>> = self
            .sequences
            .into_iter()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        // Stable, so equal-length alternatives stay in order of first appearance.
        start.sort_by_key(Vec::len);
        let start = remove_prefixes(start);
        self.rules.reverse();
        info!(
            nonterms = self.rules.len(),
            alternatives = start.len(),
            "induction finished"
        );
        Grammar::new(self.terminals, start, self.rules)
    }

    fn step(&mut self) -> Option<InductionStep> {
        let (ngram, frequency) = match most_frequent(&self.sequences, self.order) {
            Some((ngram, frequency)) if frequency >= self.min_frequency => (ngram, frequency),
            _ => return None,
        };
        let remaining = self.sequences.iter().map(Vec::len).sum::<usize>();
        let nonterm = NtIdx(self.rules.len() as u32 + 1);
        self.sequences = self
            .sequences
            .iter()
            .map(|s| substitute(s, &ngram, Symbol::Nonterm(nonterm)))
            .collect();
        debug!(%nonterm, len = ngram.len(), frequency, remaining, "new non-terminal");
        self.rules.push((nonterm, ngram.clone()));
        Some(InductionStep {
            nonterm,
            ngram,
            frequency,
            remaining,
            progression: self.sequences.len() as f64 / remaining as f64,
        })
    }
}

impl Iterator for Induction {
    type Item = InductionStep;

    fn next(&mut self) -> Option<InductionStep> {
        if self.done {
            return None;
        }
        let step = self.step();
        if step.is_none() {
            self.done = true;
        }
        step
    }
}

/// Return the most frequent n-gram in `seqs` and its frequency. Ties are broken in favour of the
/// n-gram counted first, where counting proceeds by sentence, then by ascending n-gram length,
/// then by ascending start position.
fn most_frequent(seqs: &[Vec<Symbol>], order: NgramOrder) -> Option<(Vec<Symbol>, usize)> {
    let mut counts = IndexMap::<&[Symbol], usize>::new();
    for s in seqs {
        for n in 2..=order.max_len(s.len()) {
            for w in s.windows(n) {
                *counts.entry(w).or_insert(0) += 1;
            }
        }
    }
    let mut best: Option<(&[Symbol], usize)> = None;
    for (&ngram, &c) in &counts {
        // Strictly greater, so that earlier n-grams win ties.
        if best.is_none_or(|(_, best_c)| c > best_c) {
            best = Some((ngram, c));
        }
    }
    best.map(|(ngram, c)| (ngram.to_vec(), c))
}

/// Return a copy of `seq` with each non-overlapping occurrence of `ngram`, leftmost first,
/// replaced by `nt`.
fn substitute(seq: &[Symbol], ngram: &[Symbol], nt: Symbol) -> Vec<Symbol> {
    let mut out = Vec::with_capacity(seq.len());
    let mut i = 0;
    while i < seq.len() {
        if seq[i..].starts_with(ngram) {
            out.push(nt);
            i += ngram.len();
        } else {
            out.push(seq[i]);
            i += 1;
        }
    }
    out
}

/// Drop every alternative which is a prefix of a later one. `alts` must be sorted by ascending
/// length and free of duplicates.
fn remove_prefixes(alts: Vec<Vec<Symbol>>) -> Vec<Vec<Symbol>> {
    let subsumed = (0..alts.len())
        .map(|i| alts[i + 1..].iter().any(|r2| r2.starts_with(&alts[i])))
        .collect::<Vob>();
    alts.into_iter()
        .enumerate()
        .filter(|&(i, _)| !subsumed[i])
        .map(|(_, a)| a)
        .collect()
}
