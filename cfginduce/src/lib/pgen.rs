//! Translate a [`Grammar`] into source text for the parsing engine.
//!
//! The output has two parts, in the style of a `.l`/`.y` pair:
//!
//!   * lexical rules: a `%%` line followed by one `regex "NAME"` line for the separator and for
//!     each distinct terminal literal of the grammar;
//!   * a Yacc grammar whose start rule is `s` and whose non-terminals are `nt<k>`, with an explicit
//!     separator token between every pair of adjacent symbols.
//!
//! Input to the resulting parser is thus the grammar's terminal labels joined by single spaces.

use std::collections::BTreeSet;

use crate::{
    grammar::{quote, CfgError, Grammar},
    symbol::Symbol,
};

/// The text that separates adjacent terminals in parser input.
pub const SEPARATOR: &str = " ";
/// The name of the separator token, unless a terminal of the grammar already has that name.
pub const SEPARATOR_TOKEN: &str = "SEP";
/// The name of the engine's start rule.
pub const START_RULE: &str = "s";
const SEPARATOR_RE: &str = r"\x20";

/// Lexical rules and Yacc grammar text for the parsing engine. Generation is deterministic: the
/// same [`Grammar`] always gives byte-identical text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserGrammarSource {
    lexer: String,
    grammar: String,
    separator: String,
}

impl ParserGrammarSource {
    /// Generate parser source for `grm`. A grammar whose start rule has no alternatives accepts
    /// nothing and cannot be expressed as engine source, so is rejected with
    /// [`CfgError::EmptyStart`].
    pub fn from_grammar(grm: &Grammar) -> Result<Self, CfgError> {
        if grm.start_alternatives().is_empty() {
            return Err(CfgError::EmptyStart);
        }

        let literals = grm
            .terminals()
            .iter()
            .map(|(_, n)| n)
            .collect::<BTreeSet<_>>();
        let mut separator = SEPARATOR_TOKEN.to_owned();
        while grm.terminals().get(&separator).is_some() {
            separator.push('_');
        }
        let mut lexer = String::from("%%\n");
        lexer.push_str(&format!("{} {}\n", SEPARATOR_RE, quote(&separator)));
        for lit in literals {
            lexer.push_str(&format!("{} {}\n", literal_re(lit), quote(lit)));
        }

        let mut yacc = format!("%start {}\n%%\n", START_RULE);
        let alts = grm
            .start_alternatives()
            .iter()
            .map(|alt| rhs_text(grm, &separator, alt))
            .collect::<Vec<_>>();
        yacc.push_str(&format!("{}: {};\n", START_RULE, alts.join("\n  | ")));
        for (nt, rhs) in grm.nonterm_rules() {
            yacc.push_str(&format!(
                "{}: {};\n",
                nt.to_string().to_lowercase(),
                rhs_text(grm, &separator, rhs)
            ));
        }

        Ok(ParserGrammarSource {
            lexer,
            grammar: yacc,
            separator,
        })
    }

    /// Read CFG text (as written by [`Grammar::to_cfg_text`]) and generate parser source for it.
    pub fn from_cfg_text(src: &str) -> Result<Self, CfgError> {
        ParserGrammarSource::from_grammar(&Grammar::from_cfg_text(src)?)
    }

    /// Pair hand-written lexical rules and Yacc grammar text, whose separator token is
    /// [`SEPARATOR_TOKEN`].
    pub fn from_parts(lexer: String, grammar: String) -> Self {
        ParserGrammarSource {
            lexer,
            grammar,
            separator: SEPARATOR_TOKEN.to_owned(),
        }
    }

    /// The lexical rules.
    pub fn lexer(&self) -> &str {
        &self.lexer
    }

    /// The Yacc grammar.
    pub fn grammar(&self) -> &str {
        &self.grammar
    }

    /// The name of the token matching [`SEPARATOR`].
    pub fn separator(&self) -> &str {
        &self.separator
    }
}

/// A regex matching exactly `lit`. A rule starting with `<` would be read as naming start states,
/// and one starting with `%%` as ending the rules section, so those characters are hex-escaped.
fn literal_re(lit: &str) -> String {
    let re = regex::escape(lit);
    match re.chars().next() {
        Some(c @ ('<' | '%')) => format!("\\x{:02X}{}", c as u32, &re[1..]),
        _ => re,
    }
}

fn rhs_text(grm: &Grammar, separator: &str, syms: &[Symbol]) -> String {
    let sep = format!(" {} ", quote(separator));
    syms.iter()
        .map(|&sym| match sym {
            Symbol::Term(tidx) => quote(grm.terminals().name(tidx)),
            Symbol::Nonterm(nt) => nt.to_string().to_lowercase(),
        })
        .collect::<Vec<_>>()
        .join(&sep)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::induce::Inducer;

    #[test]
    fn test_emit() {
        let pgs = ParserGrammarSource::from_cfg_text(
            "S -> NT2 | NT1 \"D\"\nNT2 -> NT1 \"C\"\nNT1 -> \"A\" \"B\"\n",
        )
        .unwrap();
        assert_eq!(
            pgs.lexer(),
            "%%\n\\x20 \"SEP\"\nA \"A\"\nB \"B\"\nC \"C\"\nD \"D\"\n"
        );
        assert_eq!(
            pgs.grammar(),
            "%start s
%%
s: nt2
  | nt1 \"SEP\" \"D\";
nt2: nt1 \"SEP\" \"C\";
nt1: \"A\" \"SEP\" \"B\";
"
        );
        assert_eq!(pgs.separator(), "SEP");
    }

    #[test]
    fn test_escaping() {
        let grm = Inducer::new().induce(&[vec!["$", "'", "."]]).unwrap();
        let pgs = ParserGrammarSource::from_grammar(&grm).unwrap();
        assert_eq!(
            pgs.lexer(),
            "%%\n\\x20 \"SEP\"\n\\$ \"$\"\n' \"'\"\n\\. \".\"\n"
        );
        assert_eq!(
            pgs.grammar(),
            "%start s\n%%\ns: \"$\" \"SEP\" \"'\" \"SEP\" \".\";\n"
        );
    }

    #[test]
    fn test_literal_re() {
        assert_eq!(literal_re("NOUN"), "NOUN");
        assert_eq!(literal_re("<UNK>"), "\\x3CUNK>");
        assert_eq!(literal_re("%%"), "\\x25%");
        assert_eq!(literal_re("a%"), "a%");
        assert_eq!(literal_re("-LRB-"), "\\-LRB\\-");
    }

    #[test]
    fn test_separator_clash() {
        let grm = Inducer::new()
            .induce(&[vec!["SEP", "SEP_"], vec!["X"]])
            .unwrap();
        let pgs = ParserGrammarSource::from_grammar(&grm).unwrap();
        assert_eq!(pgs.separator(), "SEP__");
        assert!(pgs.lexer().starts_with("%%\n\\x20 \"SEP__\"\n"));
        assert!(pgs.grammar().contains("\"SEP\" \"SEP__\" \"SEP_\""));
    }

    #[test]
    fn test_deterministic() {
        let corpus = vec![
            vec!["DET", "NOUN", "VERB"],
            vec!["PRON", "VERB", "DET", "NOUN"],
            vec!["DET", "NOUN", "VERB", "ADV"],
        ];
        let g1 = Inducer::new().induce(&corpus).unwrap();
        let g2 = Inducer::new().induce(&corpus).unwrap();
        assert_eq!(
            ParserGrammarSource::from_grammar(&g1).unwrap(),
            ParserGrammarSource::from_grammar(&g2).unwrap()
        );
    }

    #[test]
    fn test_empty_start() {
        let grm = Inducer::new().induce::<&str>(&[]).unwrap();
        match ParserGrammarSource::from_grammar(&grm) {
            Err(CfgError::EmptyStart) => (),
            x => panic!("{:?}", x),
        }
    }
}
