//! Corpus statistics used to weight scores.

use std::{collections::HashMap, hash::Hash};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::corpus::{tag_sentences, Tagger};

/// A frequency distribution: how often each distinct sample has been seen.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FreqDist<K: Eq + Hash> {
    counts: HashMap<K, usize>,
    total: usize,
}

impl<K: Eq + Hash> FreqDist<K> {
    pub fn new() -> Self {
        FreqDist {
            counts: HashMap::new(),
            total: 0,
        }
    }

    pub fn add(&mut self, k: K) {
        *self.counts.entry(k).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn count(&self, k: &K) -> usize {
        self.counts.get(k).copied().unwrap_or(0)
    }

    /// The relative frequency of `k`: 0 for unseen samples and for an empty distribution.
    /// Frequencies over all samples sum to 1.
    pub fn freq(&self, k: &K) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(k) as f64 / self.total as f64
        }
    }

    /// How many samples have been added?
    pub fn total(&self) -> usize {
        self.total
    }

    /// How many distinct samples have been added?
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, usize)> {
        self.counts.iter().map(|(k, c)| (k, *c))
    }
}

impl<K: Eq + Hash> Default for FreqDist<K> {
    fn default() -> Self {
        FreqDist::new()
    }
}

impl<K: Eq + Hash> FromIterator<K> for FreqDist<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut fd = FreqDist::new();
        for k in iter {
            fd.add(k);
        }
        fd
    }
}

/// Sentence-initial, unigram and bigram distributions of a tagged corpus.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frequencies {
    pub initial: FreqDist<String>,
    pub unigram: FreqDist<String>,
    pub bigram: FreqDist<(String, String)>,
}

impl Frequencies {
    pub fn from_sentences<S: AsRef<str>>(sentences: &[Vec<S>]) -> Self {
        let mut f = Frequencies::default();
        for sent in sentences {
            if let Some(first) = sent.first() {
                f.initial.add(first.as_ref().to_owned());
            }
            for t in sent {
                f.unigram.add(t.as_ref().to_owned());
            }
            for w in sent.windows(2) {
                f.bigram
                    .add((w[0].as_ref().to_owned(), w[1].as_ref().to_owned()));
            }
        }
        f
    }

    /// Tag every raw sentence in `raws` with `tagger` and compute the frequencies of the result.
    pub fn from_raw<T: Tagger + ?Sized, S: AsRef<str>>(raws: &[S], tagger: &T) -> Self {
        Frequencies::from_sentences(&tag_sentences(tagger, raws))
    }

    /// The weight of `sentence`: the smoothed probability of its first tag starting a sentence,
    /// multiplied by the smoothed conditional probability of each subsequent tag given its
    /// predecessor. `eps` is added to every frequency so that unseen events don't zero the
    /// product. An empty sentence has weight 0.
    pub fn weight<S: AsRef<str>>(&self, sentence: &[S], eps: f64) -> f64 {
        let Some(first) = sentence.first() else {
            return 0.0;
        };
        let mut w = self.initial.freq(&first.as_ref().to_owned()) + eps;
        for pair in sentence.windows(2) {
            let (a, b) = (pair[0].as_ref().to_owned(), pair[1].as_ref().to_owned());
            let uni = self.unigram.freq(&a) + eps;
            w *= (self.bigram.freq(&(a, b)) + eps) / uni;
        }
        w
    }
}
