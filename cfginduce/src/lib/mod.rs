#![allow(clippy::new_without_default)]
#![allow(clippy::upper_case_acronyms)]

//! A library for inducing context-free grammars from corpora of part-of-speech tagged sentences,
//! and for measuring how well an induced grammar accounts for sentences it has not seen.
//!
//! Induction works by compression. The most frequent n-gram across the corpus is replaced, in
//! every sentence, by a fresh non-terminal `NT<k>` whose single production is that n-gram; this
//! repeats until no n-gram occurs often enough to be worth replacing. The sentences that remain
//! become the alternatives of the start rule `S`. For example, from the sentences:
//!
//! ```text
//! A B C
//! A B D
//! A B C
//! ```
//!
//! the grammar:
//!
//! ```text
//! S -> NT2 | NT1 "D"
//! NT2 -> NT1 "C"
//! NT1 -> "A" "B"
//! ```
//!
//! is induced. The terminology follows `cfgrammar`'s:
//!
//!   * A *terminal* is an opaque label, usually a part-of-speech tag.
//!   * A *non-terminal* `NT<k>` stands for a fixed sequence of symbols.
//!   * A *rule* maps `S` or a non-terminal to its production(s).
//!
//! The pipeline, from corpus to score, is:
//!
//! ```text
//! use cfginduce::{
//!     corpus::{read_corpus, CorpusMode},
//!     engine::Parser,
//!     induce::Inducer,
//!     pgen::ParserGrammarSource,
//!     score::{ScoreMode, Scorer, WeightSource},
//! };
//!
//! let train = read_corpus("the_DET cat_NOUN sat_VERB\n", CorpusMode::TokenTag)?;
//! let grm = Inducer::new().induce(&train)?;
//! let parser = Parser::compile(&ParserGrammarSource::from_grammar(&grm)?)?;
//! let ev = Scorer::new(ScoreMode::Fast).evaluate(&parser, &test, WeightSource::TestSet)?;
//! println!("{} {}", ev.precision, ev.dispersion);
//! ```
//!
//! Grammars can be written to, and read back from, a plain-text CFG format (see
//! [`grammar`]). Parsing is done by an Earley recogniser over `cfgrammar`'s `YaccGrammar`
//! (see [`engine`]), so an induced grammar accepts exactly the sentences it derives.

pub mod corpus;
pub mod engine;
pub mod grammar;
pub mod induce;
pub mod pgen;
pub mod score;
pub mod stats;
mod symbol;

pub use crate::{
    grammar::{CfgError, Grammar, Rule},
    induce::{InduceError, Inducer, Induction, InductionStep, NgramOrder},
    symbol::{NtIdx, Symbol, TermIdx, Terminals},
};
