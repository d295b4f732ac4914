//! An Earley recogniser over a [`YaccGrammar`], with nullable rules handled in the predictor as
//! described in Aycock and Horspool, "Practical Earley Parsing" (2002). Unlike an LR parser, it
//! accepts exactly the language of the grammar, whatever conflicts the grammar has.

use std::collections::HashSet;

use cfgrammar::{yacc::YaccGrammar, PIdx, RIdx, Span, Symbol, TIdx};
use indexmap::IndexSet;
use vob::Vob;

use super::Node;

/// A dotted production `pidx` started at input position `origin`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
struct Item {
    pidx: PIdx<u32>,
    dot: usize,
    origin: usize,
}

/// Return a bitset recording which rules of `grm` can derive the empty string.
pub(super) fn nullable(grm: &YaccGrammar<u32>) -> Vob {
    let mut nullable = (0..usize::from(grm.rules_len()))
        .map(|_| false)
        .collect::<Vob>();
    loop {
        let mut changed = false;
        for ridx in grm.iter_rules() {
            if nullable[usize::from(ridx)] {
                continue;
            }
            let n = grm.rule_to_prods(ridx).iter().any(|&pidx| {
                grm.prod(pidx).iter().all(|sym| match *sym {
                    Symbol::Rule(r) => nullable[usize::from(r)],
                    Symbol::Token(_) => false,
                })
            });
            if n {
                nullable.set(usize::from(ridx), true);
                changed = true;
            }
        }
        if !changed {
            return nullable;
        }
    }
}

/// The result of running the recogniser over a token sequence: which productions and rules
/// derive which spans of the input.
pub(super) struct Chart<'a> {
    grm: &'a YaccGrammar<u32>,
    toks: &'a [(TIdx<u32>, Span)],
    completed: HashSet<(PIdx<u32>, usize, usize)>,
    completed_rules: HashSet<(RIdx<u32>, usize, usize)>,
}

impl<'a> Chart<'a> {
    pub(super) fn new(
        grm: &'a YaccGrammar<u32>,
        nullable: &Vob,
        start: RIdx<u32>,
        toks: &'a [(TIdx<u32>, Span)],
    ) -> Self {
        let mut chart = Chart {
            grm,
            toks,
            completed: HashSet::new(),
            completed_rules: HashSet::new(),
        };
        let mut columns = vec![IndexSet::new(); toks.len() + 1];
        for &pidx in grm.rule_to_prods(start) {
            columns[0].insert(Item {
                pidx,
                dot: 0,
                origin: 0,
            });
        }
        for k in 0..columns.len() {
            // Items are appended to `columns[k]` while it's being walked over.
            let mut j = 0;
            while j < columns[k].len() {
                let item = columns[k][j];
                j += 1;
                let prod = grm.prod(item.pidx);
                if item.dot < prod.len() {
                    match prod[item.dot] {
                        Symbol::Rule(ridx) => {
                            for &pidx in grm.rule_to_prods(ridx) {
                                columns[k].insert(Item {
                                    pidx,
                                    dot: 0,
                                    origin: k,
                                });
                            }
                            if nullable[usize::from(ridx)] {
                                columns[k].insert(Item {
                                    dot: item.dot + 1,
                                    ..item
                                });
                            }
                        }
                        Symbol::Token(tidx) => {
                            if k < toks.len() && toks[k].0 == tidx {
                                columns[k + 1].insert(Item {
                                    dot: item.dot + 1,
                                    ..item
                                });
                            }
                        }
                    }
                } else {
                    let ridx = grm.prod_to_rule(item.pidx);
                    chart.completed.insert((item.pidx, item.origin, k));
                    chart.completed_rules.insert((ridx, item.origin, k));
                    let advanced = columns[item.origin]
                        .iter()
                        .filter(|it| grm.prod(it.pidx).get(it.dot) == Some(&Symbol::Rule(ridx)))
                        .map(|it| Item {
                            dot: it.dot + 1,
                            ..*it
                        })
                        .collect::<Vec<_>>();
                    for it in advanced {
                        columns[k].insert(it);
                    }
                }
            }
        }
        chart
    }

    /// Does `ridx` derive the whole input?
    pub(super) fn accepts(&self, ridx: RIdx<u32>) -> bool {
        self.completed_rules.contains(&(ridx, 0, self.toks.len()))
    }

    /// Build a parse tree rooted at `ridx` for the whole input, if there is one. Where the input is
    /// ambiguous, the first derivation found (trying productions in grammar order and shorter
    /// spans for earlier symbols first) is returned.
    pub(super) fn tree(&self, ridx: RIdx<u32>) -> Option<Node> {
        let mut active = HashSet::new();
        self.build_rule(ridx, 0, self.toks.len(), &mut active)
    }

    fn build_rule(
        &self,
        ridx: RIdx<u32>,
        i: usize,
        j: usize,
        active: &mut HashSet<(RIdx<u32>, usize, usize)>,
    ) -> Option<Node> {
        // A rule deriving itself over the same span (e.g. via unit productions) adds nothing.
        if !active.insert((ridx, i, j)) {
            return None;
        }
        let mut r = None;
        for &pidx in self.grm.rule_to_prods(ridx) {
            if !self.completed.contains(&(pidx, i, j)) {
                continue;
            }
            if let Some(nodes) = self.build_seq(self.grm.prod(pidx), i, j, active) {
                r = Some(Node::Nonterm { ridx, nodes });
                break;
            }
        }
        active.remove(&(ridx, i, j));
        r
    }

    fn build_seq(
        &self,
        syms: &[Symbol<u32>],
        i: usize,
        j: usize,
        active: &mut HashSet<(RIdx<u32>, usize, usize)>,
    ) -> Option<Vec<Node>> {
        let Some((&sym, rest)) = syms.split_first() else {
            return if i == j { Some(Vec::new()) } else { None };
        };
        match sym {
            Symbol::Token(tidx) => {
                if i < j && self.toks[i].0 == tidx {
                    let mut nodes = self.build_seq(rest, i + 1, j, active)?;
                    nodes.insert(
                        0,
                        Node::Term {
                            tidx,
                            span: self.toks[i].1,
                        },
                    );
                    Some(nodes)
                } else {
                    None
                }
            }
            Symbol::Rule(ridx) => {
                for mid in i..=j {
                    if !self.completed_rules.contains(&(ridx, i, mid)) {
                        continue;
                    }
                    if let Some(child) = self.build_rule(ridx, i, mid, active) {
                        if let Some(mut nodes) = self.build_seq(rest, mid, j, active) {
                            nodes.insert(0, child);
                            return Some(nodes);
                        }
                    }
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use cfgrammar::yacc::{YaccKind, YaccOriginalActionKind};

    fn grammar(src: &str) -> YaccGrammar<u32> {
        YaccGrammar::new(
            YaccKind::Original(YaccOriginalActionKind::GenericParseTree),
            src,
        )
        .unwrap()
    }

    fn toks(grm: &YaccGrammar<u32>, names: &[&str]) -> Vec<(TIdx<u32>, Span)> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| (grm.token_idx(n).unwrap(), Span::new(i, i + 1)))
            .collect()
    }

    #[test]
    fn test_nullable() {
        let grm = grammar(
            "%start A
%%
A: B C 'x';
B: ;
C: B B | 'y';
",
        );
        let nullable = nullable(&grm);
        let rule = |n| usize::from(grm.rule_idx(n).unwrap());
        assert!(!nullable[rule("A")]);
        assert!(nullable[rule("B")]);
        assert!(nullable[rule("C")]);
    }

    #[test]
    fn test_recognise() {
        // Left-recursive, right-recursive and ambiguous all at once.
        let grm = grammar(
            "%start E
%%
E: E '+' E | T;
T: T '*' 'a' | 'a';
",
        );
        let e = grm.rule_idx("E").unwrap();
        let nullable = nullable(&grm);
        let accepts = |names: &[&str]| {
            let ts = toks(&grm, names);
            Chart::new(&grm, &nullable, e, &ts).accepts(e)
        };
        assert!(accepts(&["a"]));
        assert!(accepts(&["a", "+", "a", "*", "a", "+", "a"]));
        assert!(!accepts(&[]));
        assert!(!accepts(&["a", "+"]));
        assert!(!accepts(&["+", "a"]));
    }

    #[test]
    fn test_nullable_rules() {
        let grm = grammar(
            "%start A
%%
A: B 'x' B;
B: C C;
C: | 'y';
",
        );
        let a = grm.rule_idx("A").unwrap();
        let nullable = nullable(&grm);
        for names in [
            vec!["x"],
            vec!["y", "x"],
            vec!["x", "y", "y"],
            vec!["y", "y", "x", "y"],
        ] {
            let ts = toks(&grm, &names);
            let chart = Chart::new(&grm, &nullable, a, &ts);
            assert!(chart.accepts(a), "{:?}", names);
            assert!(chart.tree(a).is_some(), "{:?}", names);
        }
        let ts = toks(&grm, &["y", "y", "y", "x"]);
        assert!(!Chart::new(&grm, &nullable, a, &ts).accepts(a));
    }

    #[test]
    fn test_tree() {
        let grm = grammar(
            "%start S
%%
S: N 'c' | N 'd';
N: 'a' 'b';
",
        );
        let s = grm.rule_idx("S").unwrap();
        let n = grm.rule_idx("N").unwrap();
        let ts = toks(&grm, &["a", "b", "d"]);
        let chart = Chart::new(&grm, &nullable(&grm), s, &ts);
        let tok = |name: &str, i| Node::Term {
            tidx: grm.token_idx(name).unwrap(),
            span: Span::new(i, i + 1),
        };
        assert_eq!(
            chart.tree(s),
            Some(Node::Nonterm {
                ridx: s,
                nodes: vec![
                    Node::Nonterm {
                        ridx: n,
                        nodes: vec![tok("a", 0), tok("b", 1)]
                    },
                    tok("d", 2)
                ]
            })
        );
        let ts = toks(&grm, &["a", "b"]);
        assert_eq!(Chart::new(&grm, &nullable(&grm), s, &ts).tree(s), None);
    }

    #[test]
    fn test_unit_cycle() {
        let grm = grammar(
            "%start A
%%
A: B | 'x';
B: A;
",
        );
        let a = grm.rule_idx("A").unwrap();
        let ts = toks(&grm, &["x"]);
        let chart = Chart::new(&grm, &nullable(&grm), a, &ts);
        assert!(chart.accepts(a));
        assert!(chart.tree(a).is_some());
    }
}
