//! Reading and writing tagged corpora, and the interface to an external part-of-speech tagger.
//!
//! A corpus is line-oriented text with one sentence per line. Two encodings are supported:
//!
//!   * [`CorpusMode::Tags`]: each line is a whitespace-separated sequence of tags, e.g.
//!     `DET NOUN VERB PUNCT`.
//!   * [`CorpusMode::TokenTag`] (the default): each line is a whitespace-separated sequence of
//!     `token_TAG` words, the tag being everything after the final underscore, e.g.
//!     `the_DET cat_NOUN sat_VERB ._PUNCT`.
//!
//! Malformed lines are never skipped: doing so would silently bias the corpus statistics.

use std::{fs, io, path::Path};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("line {line}: empty sentence")]
    EmptyLine { line: usize },
    #[error("line {line}: '{word}' has no '_TAG' suffix")]
    MissingTag { line: usize, word: String },
    #[error("line {line}: tag '{tag}' contains both kinds of quote character")]
    UnquotableTag { line: usize, tag: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CorpusMode {
    /// One whitespace-separated sequence of tags per line.
    Tags,
    /// One whitespace-separated sequence of `token_TAG` words per line.
    #[default]
    TokenTag,
}

/// Parse `text` into a list of tag sequences, one per line.
pub fn read_corpus(text: &str, mode: CorpusMode) -> Result<Vec<Vec<String>>, CorpusError> {
    text.lines()
        .enumerate()
        .map(|(i, l)| read_line(i + 1, l, mode))
        .collect()
}

/// Read the file at `path` and parse it with [`read_corpus`].
pub fn read_corpus_file<P: AsRef<Path>>(
    path: P,
    mode: CorpusMode,
) -> Result<Vec<Vec<String>>, CorpusError> {
    read_corpus(&fs::read_to_string(path)?, mode)
}

fn read_line(line: usize, l: &str, mode: CorpusMode) -> Result<Vec<String>, CorpusError> {
    let mut tags = Vec::new();
    for word in l.split_whitespace() {
        let tag = match mode {
            CorpusMode::Tags => word,
            CorpusMode::TokenTag => match split_token_tag(word) {
                Some((_, tag)) => tag,
                None => {
                    return Err(CorpusError::MissingTag {
                        line,
                        word: word.to_owned(),
                    });
                }
            },
        };
        // Tags end up as quoted literals in grammar files, so they need a quote character they
        // don't themselves contain.
        if tag.contains('"') && tag.contains('\'') {
            return Err(CorpusError::UnquotableTag {
                line,
                tag: tag.to_owned(),
            });
        }
        tags.push(tag.to_owned());
    }
    if tags.is_empty() {
        return Err(CorpusError::EmptyLine { line });
    }
    Ok(tags)
}

/// Split `token_TAG` at its final underscore. Returns `None` if there is no underscore or the tag
/// is empty.
pub fn split_token_tag(word: &str) -> Option<(&str, &str)> {
    let i = word.rfind('_')?;
    let tag = &word[i + 1..];
    if tag.is_empty() {
        None
    } else {
        Some((&word[..i], tag))
    }
}

/// Render tag sequences in [`CorpusMode::Tags`] encoding.
pub fn write_corpus<S: AsRef<str>>(sentences: &[Vec<S>]) -> String {
    let mut s = String::new();
    for sent in sentences {
        let words = sent.iter().map(|w| w.as_ref()).collect::<Vec<_>>();
        s.push_str(&words.join(" "));
        s.push('\n');
    }
    s
}

/// A word of a raw sentence together with its part-of-speech tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedWord {
    pub text: String,
    pub tag: String,
}

/// An external part-of-speech tagger. Implementations are responsible for tokenising `sentence`
/// and returning its words, in order, each with a tag.
pub trait Tagger {
    fn tag(&self, sentence: &str) -> Vec<TaggedWord>;
}

/// Tag every raw sentence in `raws`, returning only the tags.
pub fn tag_sentences<T: Tagger + ?Sized, S: AsRef<str>>(
    tagger: &T,
    raws: &[S],
) -> Vec<Vec<String>> {
    raws.iter()
        .map(|r| tagger.tag(r.as_ref()).into_iter().map(|w| w.tag).collect())
        .collect()
}

/// A [`Tagger`] for text that has already been annotated in `token_TAG` form: words are split on
/// whitespace and their final underscore. A word without a usable tag is its own tag.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenTagSplitter;

impl Tagger for TokenTagSplitter {
    fn tag(&self, sentence: &str) -> Vec<TaggedWord> {
        sentence
            .split_whitespace()
            .map(|w| match split_token_tag(w) {
                Some((text, tag)) => TaggedWord {
                    text: text.to_owned(),
                    tag: tag.to_owned(),
                },
                None => TaggedWord {
                    text: w.to_owned(),
                    tag: w.to_owned(),
                },
            })
            .collect()
    }
}
