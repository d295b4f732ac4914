//! Compile [`ParserGrammarSource`]s into parsers.
//!
//! The Yacc half of the source is read with `cfgrammar`; the lexical half with `lrlex`. Parsing
//! proper is done by an Earley recogniser, so a [`Parser`] accepts exactly the sentences its
//! grammar derives.

use cfgrammar::{
    yacc::{YaccGrammar, YaccKind, YaccOriginalActionKind},
    RIdx, Span, Symbol, TIdx,
};
use lrlex::{DefaultLexerTypes, LRNonStreamingLexerDef, LexerDef};
use lrpar::{LexError, Lexeme, Lexer};
use thiserror::Error;
use tracing::{debug, warn};
use vob::Vob;

mod earley;

use crate::pgen::{ParserGrammarSource, SEPARATOR};
use earley::Chart;

/// The source of a parser could not be compiled. Unlike [`ParseFailure`], this always indicates a
/// configuration problem.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("lexer: {0}")]
    Lexer(String),
    #[error("grammar: {0}")]
    Grammar(String),
    #[error("tokens referenced in the grammar but not defined in the lexer: {}", .0.join(", "))]
    MissingLexRules(Vec<String>),
}

/// The parser rejected its input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("no lexical rule matches at byte {offset}")]
    Lex { offset: usize },
    #[error("syntax error at byte {offset}")]
    Syntax { offset: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Term { tidx: TIdx<u32>, span: Span },
    Nonterm { ridx: RIdx<u32>, nodes: Vec<Node> },
}

impl Node {
    /// Return a pretty-printed version of this node. Separators are omitted.
    pub fn pp(&self, grm: &YaccGrammar<u32>, input: &str) -> String {
        let mut st = vec![(0, self)]; // Stack of (indent level, node) pairs
        let mut s = String::new();
        while let Some((indent, e)) = st.pop() {
            match *e {
                Node::Term { tidx, span } => {
                    let text = &input[span.start()..span.end()];
                    if text == SEPARATOR {
                        continue;
                    }
                    s.push_str(&" ".repeat(indent));
                    s.push_str(&format!("{} {}\n", grm.token_name(tidx).unwrap_or(""), text));
                }
                Node::Nonterm { ridx, ref nodes } => {
                    s.push_str(&" ".repeat(indent));
                    s.push_str(&format!("{}\n", grm.rule_name_str(ridx)));
                    for x in nodes.iter().rev() {
                        st.push((indent + 1, x));
                    }
                }
            }
        }
        s
    }
}

/// A compiled parser for terminal sequences joined by [`SEPARATOR`].
pub struct Parser {
    grm: YaccGrammar<u32>,
    start: RIdx<u32>,
    sep: Option<TIdx<u32>>,
    lexerdef: LRNonStreamingLexerDef<DefaultLexerTypes<u32>>,
    nullable: Vob,
}

impl Parser {
    pub fn compile(pgs: &ParserGrammarSource) -> Result<Parser, CompileError> {
        let grm = YaccGrammar::new(
            YaccKind::Original(YaccOriginalActionKind::GenericParseTree),
            pgs.grammar(),
        )
        .map_err(|e| CompileError::Grammar(format!("{:?}", e)))?;
        // The implicit start production is `^: <start rule>`.
        let start = match grm.prod(grm.start_prod()).first() {
            Some(Symbol::Rule(ridx)) => *ridx,
            _ => return Err(CompileError::Grammar("no start rule".to_owned())),
        };

        let mut lexerdef = LRNonStreamingLexerDef::<DefaultLexerTypes<u32>>::from_str(pgs.lexer())
            .map_err(|errs| {
                CompileError::Lexer(
                    errs.iter()
                        .map(|e| e.to_string())
                        .collect::<Vec<_>>()
                        .join("; "),
                )
            })?;
        {
            let rule_ids = grm
                .tokens_map()
                .iter()
                .map(|(&n, &tidx)| (n, tidx.as_storaget()))
                .collect();
            let (missing_from_lexer, missing_from_parser) = lexerdef.set_rule_ids(&rule_ids);
            if let Some(tokens) = missing_from_lexer {
                let mut sorted = tokens.iter().map(|n| n.to_string()).collect::<Vec<_>>();
                sorted.sort_unstable();
                return Err(CompileError::MissingLexRules(sorted));
            }
            if let Some(tokens) = missing_from_parser {
                let mut sorted = tokens.iter().cloned().collect::<Vec<&str>>();
                sorted.sort_unstable();
                warn!(
                    tokens = %sorted.join(", "),
                    "lexical rules define tokens the grammar doesn't reference"
                );
            }
        }

        let nullable = earley::nullable(&grm);
        let sep = grm.token_idx(pgs.separator());
        debug!(
            rules = usize::from(grm.rules_len()),
            tokens = usize::from(grm.tokens_len()),
            "compiled parser"
        );
        Ok(Parser {
            grm,
            start,
            sep,
            lexerdef,
            nullable,
        })
    }

    /// The engine's view of the grammar, needed to interpret [`Node`]s.
    pub fn grammar(&self) -> &YaccGrammar<u32> {
        &self.grm
    }

    /// Lex and parse `input`, returning a parse tree.
    pub fn parse(&self, input: &str) -> Result<Node, ParseFailure> {
        let lexer = self.lexerdef.lexer(input);
        let toks = lexer
            .iter()
            .map(|r| match r {
                Ok(l) => Ok((TIdx(l.tok_id()), l.span())),
                Err(e) => Err(ParseFailure::Lex {
                    offset: e.span().start(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let chart = Chart::new(&self.grm, &self.nullable, self.start, &toks);
        chart.tree(self.start).ok_or(ParseFailure::Syntax {
            offset: furthest(&toks, input),
        })
    }

    /// Parse the terminal sequence `terms`, returning a parse tree whose spans index into
    /// `terms.join(SEPARATOR)`.
    pub fn parse_tokens<S: AsRef<str>>(&self, terms: &[S]) -> Result<Node, ParseFailure> {
        self.parse(&join(terms))
    }

    /// Does the grammar derive the terminal sequence `terms`? This is [`Parser::parse_tokens`]
    /// without building a parse tree.
    pub fn accepts<S: AsRef<str>>(&self, terms: &[S]) -> bool {
        let Some(toks) = self.tokens(terms) else {
            return false;
        };
        Chart::new(&self.grm, &self.nullable, self.start, &toks).accepts(self.start)
    }

    /// Map `terms` directly to grammar tokens, interleaving separators, without going through the
    /// lexer. Returns `None` if any term is unknown to the grammar.
    fn tokens<S: AsRef<str>>(&self, terms: &[S]) -> Option<Vec<(TIdx<u32>, Span)>> {
        let mut toks = Vec::with_capacity(terms.len() * 2);
        let mut off = 0;
        for (i, t) in terms.iter().enumerate() {
            let t = t.as_ref();
            if i > 0 {
                toks.push((self.sep?, Span::new(off, off + SEPARATOR.len())));
                off += SEPARATOR.len();
            }
            let tidx = self.grm.token_idx(t).filter(|&tidx| Some(tidx) != self.sep)?;
            toks.push((tidx, Span::new(off, off + t.len())));
            off += t.len();
        }
        Some(toks)
    }
}

fn join<S: AsRef<str>>(terms: &[S]) -> String {
    terms
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// An approximation of where a syntax error lies: the end of the input.
fn furthest(toks: &[(TIdx<u32>, Span)], input: &str) -> usize {
    toks.last().map(|(_, span)| span.end()).unwrap_or(input.len())
}
