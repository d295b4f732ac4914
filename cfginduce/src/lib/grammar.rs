//! Induced grammars, and their plain-text CFG form.
//!
//! The text form has one production per line. Terminals are quoted; non-terminals are written
//! `NT<k>`; the start rule `S` lists its alternatives separated by `|`:
//!
//! ```text
//! S -> NT2 | NT1 "D"
//! NT2 -> NT1 "C"
//! NT1 -> "A" "B"
//! ```
//!
//! A start rule with no alternatives (the grammar of an empty corpus) is written `S ->`.

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet, HashSet},
    fs, io,
    path::Path,
};

use lazy_static::lazy_static;
use regex::Regex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::symbol::{NtIdx, Symbol, Terminals};

/// The name of the start rule in CFG text.
pub const START_NAME: &str = "S";

lazy_static! {
    static ref RE_PRODUCTION: Regex = Regex::new(r"^\s*(\S+)\s*->(.*)$").unwrap();
    static ref RE_RHS_SYMBOL: Regex =
        Regex::new(r#"^\s*(?:"([^"]+)"|'([^']+)'|(\|)|([^\s"'|]+))"#).unwrap();
}

#[derive(Debug, Error)]
pub enum CfgError {
    #[error("line {line}: {msg}")]
    Malformed { line: usize, msg: String },
    #[error("line {line}: '{name}' is neither a quoted terminal nor a non-terminal NT<k>")]
    UnknownSymbol { line: usize, name: String },
    #[error("line {line}: duplicate definition of '{name}'")]
    DuplicateRule { line: usize, name: String },
    #[error("line {line}: '{name}' must have exactly one production")]
    MultipleAlternatives { line: usize, name: String },
    #[error("line {line}: empty production for '{name}'")]
    EmptyProduction { line: usize, name: String },
    #[error("no start rule '{}'", START_NAME)]
    MissingStart,
    #[error("the start rule has no alternatives")]
    EmptyStart,
    #[error("'{0}' is referenced but never defined")]
    Dangling(NtIdx),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A borrowed view of one rule of a [`Grammar`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule<'a> {
    /// The start rule `S` and its alternatives.
    Start(&'a [Vec<Symbol>]),
    /// `NT<k> -> symbols`.
    Nonterm(NtIdx, &'a [Symbol]),
}

/// An induced grammar: a start rule `S` with a set of alternatives, and a list of non-terminal
/// rules each standing for a fixed sequence of symbols. Rules are ordered with `S` first, then
/// non-terminals from the most recently created to the earliest.
///
/// Every non-terminal referenced from a right-hand side has a defining rule.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Grammar {
    terminals: Terminals,
    start: Vec<Vec<Symbol>>,
    rules: Vec<(NtIdx, Vec<Symbol>)>,
}

impl Grammar {
    pub(crate) fn new(
        terminals: Terminals,
        start: Vec<Vec<Symbol>>,
        rules: Vec<(NtIdx, Vec<Symbol>)>,
    ) -> Self {
        Grammar {
            terminals,
            start,
            rules,
        }
    }

    pub fn terminals(&self) -> &Terminals {
        &self.terminals
    }

    /// The alternatives of the start rule `S`.
    pub fn start_alternatives(&self) -> &[Vec<Symbol>] {
        &self.start
    }

    /// The non-terminal rules, most recently created first.
    pub fn nonterm_rules(&self) -> impl Iterator<Item = (NtIdx, &[Symbol])> {
        self.rules.iter().map(|(n, rhs)| (*n, rhs.as_slice()))
    }

    /// All rules in serialisation order: `S` first, then [`Grammar::nonterm_rules`].
    pub fn rules(&self) -> impl Iterator<Item = Rule<'_>> {
        std::iter::once(Rule::Start(&self.start))
            .chain(self.nonterm_rules().map(|(n, rhs)| Rule::Nonterm(n, rhs)))
    }

    /// How many rules (including `S`) does this grammar have?
    pub fn rules_len(&self) -> usize {
        self.rules.len() + 1
    }

    pub fn nonterms_len(&self) -> usize {
        self.rules.len()
    }

    /// Return the right-hand side of `nt`, or `None` if it isn't defined in this grammar.
    pub fn nonterm_rhs(&self, nt: NtIdx) -> Option<&[Symbol]> {
        self.rules
            .iter()
            .find(|(n, _)| *n == nt)
            .map(|(_, rhs)| rhs.as_slice())
    }

    /// The name of `sym`: a terminal's label, or `NT<k>`.
    pub fn symbol_name(&self, sym: Symbol) -> Cow<'_, str> {
        match sym {
            Symbol::Term(tidx) => Cow::Borrowed(self.terminals.name(tidx)),
            Symbol::Nonterm(nt) => Cow::Owned(nt.to_string()),
        }
    }

    /// Return the terminals `sym` derives, in order.
    pub fn expand(&self, sym: Symbol) -> Vec<&str> {
        let mut out = Vec::new();
        let mut st = vec![sym];
        while let Some(s) = st.pop() {
            match s {
                Symbol::Term(tidx) => out.push(self.terminals.name(tidx)),
                Symbol::Nonterm(nt) => {
                    if let Some(rhs) = self.nonterm_rhs(nt) {
                        st.extend(rhs.iter().rev());
                    }
                }
            }
        }
        out
    }

    /// Render this grammar as CFG text.
    pub fn to_cfg_text(&self) -> String {
        let mut s = String::new();
        for rule in self.rules() {
            match rule {
                Rule::Start(alts) => {
                    s.push_str(START_NAME);
                    s.push_str(" ->");
                    for (i, alt) in alts.iter().enumerate() {
                        if i > 0 {
                            s.push_str(" |");
                        }
                        self.push_symbols(&mut s, alt);
                    }
                }
                Rule::Nonterm(nt, rhs) => {
                    s.push_str(&format!("{} ->", nt));
                    self.push_symbols(&mut s, rhs);
                }
            }
            s.push('\n');
        }
        s
    }

    fn push_symbols(&self, s: &mut String, syms: &[Symbol]) {
        for &sym in syms {
            s.push(' ');
            match sym {
                Symbol::Term(tidx) => s.push_str(&quote(self.terminals.name(tidx))),
                Symbol::Nonterm(nt) => s.push_str(&nt.to_string()),
            }
        }
    }

    /// Read a grammar from CFG text. Blank lines and lines starting with `#` are ignored.
    pub fn from_cfg_text(src: &str) -> Result<Grammar, CfgError> {
        let mut terminals = Terminals::new();
        let mut start = None;
        let mut rules = Vec::new();
        let mut defined = HashSet::new();
        let mut referenced = Vec::new();
        for (i, l) in src.lines().enumerate() {
            let line = i + 1;
            if l.trim().is_empty() || l.trim_start().starts_with('#') {
                continue;
            }
            let caps = RE_PRODUCTION.captures(l).ok_or_else(|| CfgError::Malformed {
                line,
                msg: "expected 'LHS -> RHS'".to_owned(),
            })?;
            let name = &caps[1];
            let alts = read_alternatives(line, name, &caps[2], &mut terminals)?;
            for sym in alts.iter().flatten() {
                if let Symbol::Nonterm(nt) = *sym {
                    referenced.push(nt);
                }
            }
            if name == START_NAME {
                if start.is_some() {
                    return Err(CfgError::DuplicateRule {
                        line,
                        name: name.to_owned(),
                    });
                }
                // `S ->` with nothing after it has no alternatives at all.
                if alts.len() == 1 && alts[0].is_empty() {
                    start = Some(Vec::new());
                } else {
                    if alts.iter().any(Vec::is_empty) {
                        return Err(CfgError::EmptyProduction {
                            line,
                            name: name.to_owned(),
                        });
                    }
                    start = Some(alts);
                }
            } else {
                let nt = NtIdx::from_name(name).ok_or_else(|| CfgError::UnknownSymbol {
                    line,
                    name: name.to_owned(),
                })?;
                if !defined.insert(nt) {
                    return Err(CfgError::DuplicateRule {
                        line,
                        name: name.to_owned(),
                    });
                }
                let mut alts = alts;
                if alts.len() != 1 {
                    return Err(CfgError::MultipleAlternatives {
                        line,
                        name: name.to_owned(),
                    });
                }
                let rhs = alts.remove(0);
                if rhs.is_empty() {
                    return Err(CfgError::EmptyProduction {
                        line,
                        name: name.to_owned(),
                    });
                }
                rules.push((nt, rhs));
            }
        }
        let start = start.ok_or(CfgError::MissingStart)?;
        if let Some(&nt) = referenced.iter().find(|nt| !defined.contains(*nt)) {
            return Err(CfgError::Dangling(nt));
        }
        Ok(Grammar::new(terminals, start, rules))
    }

    /// Read a grammar from the CFG text file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Grammar, CfgError> {
        Grammar::from_cfg_text(&fs::read_to_string(path)?)
    }

    /// Write this grammar's CFG text to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        fs::write(path, self.to_cfg_text())
    }

    /// A name-based view of this grammar's rules, independent of terminal numbering and of the
    /// order of `S`'s alternatives. Two grammars with the same view define the same rules.
    pub fn named_rules(&self) -> BTreeMap<String, BTreeSet<Vec<String>>> {
        let names = |syms: &[Symbol]| {
            syms.iter()
                .map(|&s| self.symbol_name(s).into_owned())
                .collect::<Vec<_>>()
        };
        let mut m = BTreeMap::new();
        m.insert(
            START_NAME.to_owned(),
            self.start.iter().map(|a| names(a)).collect(),
        );
        for (nt, rhs) in &self.rules {
            m.insert(nt.to_string(), BTreeSet::from([names(rhs)]));
        }
        m
    }
}

/// Quote a terminal label with `"`, or with `'` if the label itself contains `"`.
pub(crate) fn quote(label: &str) -> String {
    if label.contains('"') {
        format!("'{}'", label)
    } else {
        format!("\"{}\"", label)
    }
}

fn read_alternatives(
    line: usize,
    name: &str,
    mut rhs: &str,
    terminals: &mut Terminals,
) -> Result<Vec<Vec<Symbol>>, CfgError> {
    let mut alts = vec![Vec::new()];
    loop {
        rhs = rhs.trim_start();
        if rhs.is_empty() {
            break;
        }
        let caps = RE_RHS_SYMBOL
            .captures(rhs)
            .ok_or_else(|| CfgError::Malformed {
                line,
                msg: format!("can't read '{}' in the production of '{}'", rhs, name),
            })?;
        if let Some(t) = caps.get(1).or_else(|| caps.get(2)) {
            let tidx = terminals.intern(t.as_str());
            alts.last_mut().unwrap().push(Symbol::Term(tidx));
        } else if caps.get(3).is_some() {
            alts.push(Vec::new());
        } else {
            let n = &caps[4];
            let nt = NtIdx::from_name(n).ok_or_else(|| CfgError::UnknownSymbol {
                line,
                name: n.to_owned(),
            })?;
            alts.last_mut().unwrap().push(Symbol::Nonterm(nt));
        }
        rhs = &rhs[caps.get(0).unwrap().end()..];
    }
    Ok(alts)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::induce::Inducer;

    fn corpus() -> Vec<Vec<&'static str>> {
        vec![
            vec!["DET", "NOUN", "VERB", "PUNCT"],
            vec!["PRON", "VERB", "DET", "NOUN", "PUNCT"],
            vec!["DET", "NOUN", "VERB", "DET", "NOUN"],
            vec!["PROPN", "VERB", "PUNCT"],
        ]
    }

    #[test]
    fn test_to_cfg_text() {
        let grm = Inducer::new()
            .induce(&[vec!["A", "B", "C"], vec!["A", "B", "D"], vec!["A", "B", "C"]])
            .unwrap();
        assert_eq!(
            grm.to_cfg_text(),
            "S -> NT2 | NT1 \"D\"\nNT2 -> NT1 \"C\"\nNT1 -> \"A\" \"B\"\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let grm = Inducer::new().induce(&corpus()).unwrap();
        let grm2 = Grammar::from_cfg_text(&grm.to_cfg_text()).unwrap();
        assert_eq!(grm.named_rules(), grm2.named_rules());
        assert_eq!(grm.to_cfg_text(), grm2.to_cfg_text());
    }

    #[test]
    fn test_quoting() {
        let grm = Inducer::new().induce(&[vec!["''", "\"x"]]).unwrap();
        let s = grm.to_cfg_text();
        assert_eq!(s, "S -> \"''\" '\"x'\n");
        let grm2 = Grammar::from_cfg_text(&s).unwrap();
        assert_eq!(grm.named_rules(), grm2.named_rules());
    }

    #[test]
    fn test_empty_start() {
        let grm = Inducer::new().induce::<&str>(&[]).unwrap();
        assert_eq!(grm.to_cfg_text(), "S ->\n");
        let grm2 = Grammar::from_cfg_text("S ->\n").unwrap();
        assert!(grm2.start_alternatives().is_empty());
    }

    #[test]
    fn test_expand() {
        let grm = Inducer::new().induce(&corpus()).unwrap();
        let mut expanded = grm
            .start_alternatives()
            .iter()
            .map(|alt| {
                alt.iter()
                    .flat_map(|&s| grm.expand(s))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        expanded.sort();
        let mut expected = corpus();
        expected.sort();
        assert_eq!(expanded, expected);
    }

    #[test]
    fn test_reader_comments() {
        let grm = Grammar::from_cfg_text(
            "# induced\n\nS -> NT1 'x' | \"y\"\n  NT1 -> \"a\" \"b\"\n",
        )
        .unwrap();
        assert_eq!(grm.start_alternatives().len(), 2);
        assert_eq!(grm.nonterms_len(), 1);
        assert_eq!(
            grm.expand(grm.start_alternatives()[0][0]),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_reader_errors() {
        match Grammar::from_cfg_text("NT1 -> \"a\" \"b\"\n") {
            Err(CfgError::MissingStart) => (),
            x => panic!("{:?}", x),
        }
        match Grammar::from_cfg_text("S -> NT2\nNT1 -> \"a\"\n") {
            Err(CfgError::Dangling(NtIdx(2))) => (),
            x => panic!("{:?}", x),
        }
        match Grammar::from_cfg_text("S -> NT1\nNT1 -> \"a\" | \"b\"\n") {
            Err(CfgError::MultipleAlternatives { line: 2, .. }) => (),
            x => panic!("{:?}", x),
        }
        match Grammar::from_cfg_text("S -> X \"a\"\n") {
            Err(CfgError::UnknownSymbol { line: 1, name }) => assert_eq!(name, "X"),
            x => panic!("{:?}", x),
        }
        match Grammar::from_cfg_text("S -> \"a\"\nS -> \"b\"\n") {
            Err(CfgError::DuplicateRule { line: 2, .. }) => (),
            x => panic!("{:?}", x),
        }
        match Grammar::from_cfg_text("S -> \"a\" |\n") {
            Err(CfgError::EmptyProduction { line: 1, .. }) => (),
            x => panic!("{:?}", x),
        }
        match Grammar::from_cfg_text("S -> \"a\nb\n") {
            Err(CfgError::Malformed { line: 1, .. }) => (),
            x => panic!("{:?}", x),
        }
    }

    #[test]
    fn test_load_save() {
        let grm = Inducer::new().induce(&corpus()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("grammar.cfg");
        grm.save(&p).unwrap();
        let grm2 = Grammar::load(&p).unwrap();
        assert_eq!(grm.named_rules(), grm2.named_rules());
        match Grammar::load(dir.path().join("missing.cfg")) {
            Err(CfgError::Io(_)) => (),
            x => panic!("{:?}", x),
        }
    }
}
