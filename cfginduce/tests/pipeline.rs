//! End-to-end tests: corpus, induction, CFG text, parser compilation and scoring.

use std::fs;

use cfginduce::{
    corpus::{read_corpus, read_corpus_file, write_corpus, CorpusMode},
    engine::Parser,
    pgen::ParserGrammarSource,
    score::{ScoreMode, Scorer, WeightSource},
    stats::Frequencies,
    Grammar, Inducer, NgramOrder, Symbol,
};
use proptest::prelude::*;

fn compile(grm: &Grammar) -> Parser {
    Parser::compile(&ParserGrammarSource::from_grammar(grm).unwrap()).unwrap()
}

/// The start alternatives of `grm` as sequences of symbol names.
fn named_alternatives(grm: &Grammar) -> Vec<Vec<String>> {
    grm.start_alternatives()
        .iter()
        .map(|alt| {
            alt.iter()
                .map(|&s| grm.symbol_name(s).into_owned())
                .collect()
        })
        .collect()
}

#[test]
fn test_first_round() {
    let corpus = read_corpus("A B C\nA B D\nA B C\n", CorpusMode::Tags).unwrap();
    let mut run = Inducer::new().start(&corpus).unwrap();
    let step = run.next().unwrap();
    assert_eq!(step.frequency, 3);
    let names = step
        .ngram
        .iter()
        .map(|&s| match s {
            Symbol::Term(t) => run.terminals().name(t).to_owned(),
            Symbol::Nonterm(_) => panic!(),
        })
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["A", "B"]);
    assert!(run.sequences().iter().all(|s| s.len() == 2));
    assert!(
        run.sequences()
            .iter()
            .all(|s| s[0] == Symbol::Nonterm(step.nonterm))
    );
}

#[test]
fn test_fast_coverage_scenario() {
    let grm = Grammar::from_cfg_text("S -> \"A\" \"B\" | \"A\" \"B\" \"C\"\n").unwrap();
    let parser = compile(&grm);
    let cov = Scorer::new(ScoreMode::Fast)
        .coverage(&parser, &["A", "B", "X"])
        .unwrap();
    assert!((cov - 2.0 / 3.0).abs() < 1e-12);
    assert_eq!(
        Scorer::new(ScoreMode::Fast).coverage(&parser, &["A", "B", "C"]),
        Some(1.0)
    );
}

#[test]
fn test_short_corpus() {
    let corpus = read_corpus("A\nB\nA\n", CorpusMode::Tags).unwrap();
    let grm = Inducer::new().induce(&corpus).unwrap();
    assert_eq!(grm.rules_len(), 1);
    assert_eq!(grm.to_cfg_text(), "S -> \"A\" | \"B\"\n");
}

#[test]
fn test_files() {
    let dir = tempfile::tempdir().unwrap();
    let train_path = dir.path().join("train.txt");
    let grm_path = dir.path().join("train.cfg");
    fs::write(
        &train_path,
        "the_DET cat_NOUN sat_VERB ._PUNCT
a_DET dog_NOUN barked_VERB ._PUNCT
she_PRON saw_VERB the_DET cat_NOUN ._PUNCT
the_DET old_ADJ dog_NOUN slept_VERB ._PUNCT
",
    )
    .unwrap();

    let train = read_corpus_file(&train_path, CorpusMode::TokenTag).unwrap();
    let grm = Inducer::new().induce(&train).unwrap();
    grm.save(&grm_path).unwrap();
    let grm = Grammar::load(&grm_path).unwrap();
    let parser = compile(&grm);

    let test = read_corpus(
        &write_corpus(&[
            vec!["DET", "NOUN", "VERB", "PUNCT"],
            vec!["DET", "NOUN", "VERB", "VERB"],
            vec!["INTJ", "PUNCT"],
        ]),
        CorpusMode::Tags,
    )
    .unwrap();
    let freqs = Frequencies::from_sentences(&train);
    let ev = Scorer::new(ScoreMode::Fast)
        .evaluate(&parser, &test, WeightSource::Corpus(&freqs))
        .unwrap();
    assert_eq!(ev.coverages[0], 1.0);
    assert!(ev.coverages[1] < 1.0);
    assert_eq!(ev.coverages[2], 0.0);
    assert_eq!((ev.full, ev.partial + ev.poor), (1, 2));
    assert!(ev.precision > 0.0 && ev.precision < 1.0);
    assert!(ev.dispersion > 0.0);
}

fn tagged_corpus() -> impl Strategy<Value = Vec<Vec<&'static str>>> {
    prop::collection::vec(
        prop::collection::vec(prop::sample::select(vec!["A", "B", "C", "D"]), 1..7),
        1..8,
    )
}

fn ngram_order() -> impl Strategy<Value = NgramOrder> {
    prop_oneof![
        Just(NgramOrder::Bounded(2)),
        Just(NgramOrder::Bounded(3)),
        Just(NgramOrder::Unbounded),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_deterministic(corpus in tagged_corpus(), order in ngram_order()) {
        let inducer = Inducer::new().max_order(order);
        let g1 = inducer.induce(&corpus).unwrap();
        let g2 = inducer.induce(&corpus).unwrap();
        prop_assert_eq!(g1.to_cfg_text(), g2.to_cfg_text());
        prop_assert_eq!(
            ParserGrammarSource::from_grammar(&g1).unwrap(),
            ParserGrammarSource::from_grammar(&g2).unwrap()
        );
    }

    #[test]
    fn prop_idempotent(corpus in tagged_corpus(), order in ngram_order()) {
        let inducer = Inducer::new().max_order(order);
        let grm = inducer.induce(&corpus).unwrap();
        let again = inducer.induce(&named_alternatives(&grm)).unwrap();
        prop_assert_eq!(again.nonterms_len(), 0);
    }

    #[test]
    fn prop_no_prefix_alternatives(corpus in tagged_corpus(), order in ngram_order()) {
        let grm = Inducer::new().max_order(order).induce(&corpus).unwrap();
        let alts = grm.start_alternatives();
        for (i, a1) in alts.iter().enumerate() {
            for (j, a2) in alts.iter().enumerate() {
                if i != j {
                    prop_assert!(!a2.starts_with(a1));
                }
            }
        }
    }

    #[test]
    fn prop_round_trip(corpus in tagged_corpus(), order in ngram_order()) {
        let grm = Inducer::new().max_order(order).induce(&corpus).unwrap();
        let grm2 = Grammar::from_cfg_text(&grm.to_cfg_text()).unwrap();
        prop_assert_eq!(grm.named_rules(), grm2.named_rules());
    }

    #[test]
    fn prop_coverage_bounds(
        corpus in tagged_corpus(),
        test in tagged_corpus(),
        exhaustive in any::<bool>()
    ) {
        let grm = Inducer::new().induce(&corpus).unwrap();
        let parser = compile(&grm);
        let mode = if exhaustive { ScoreMode::Exhaustive } else { ScoreMode::Fast };
        let scorer = Scorer::new(mode);
        for s in &test {
            let cov = scorer.coverage(&parser, s).unwrap();
            prop_assert!((0.0..=1.0).contains(&cov));
            prop_assert_eq!(cov == 1.0, parser.accepts(s));
        }
        let ev = scorer.evaluate(&parser, &test, WeightSource::TestSet).unwrap();
        prop_assert!((0.0..=1.0).contains(&ev.precision));
        prop_assert!(ev.dispersion >= 0.0);
        prop_assert_eq!(ev.full + ev.partial + ev.poor, test.len());
    }
}
