use std::{
    env,
    fmt::Display,
    io::{stderr, Write},
    path::Path,
    process,
};

use cfginduce::{
    corpus::{read_corpus_file, CorpusMode},
    engine::Parser,
    pgen::{ParserGrammarSource, SEPARATOR},
    score::{ScoreMode, Scorer, WeightSource},
    stats::Frequencies,
    Grammar, Inducer, NgramOrder,
};
use getopts::{Matches, Options};
use tracing_subscriber::EnvFilter;

fn usage(prog: &str, msg: &str) -> ! {
    let path = Path::new(prog);
    let leaf = match path.file_name() {
        Some(m) => m.to_str().unwrap_or("cfginduce"),
        None => "cfginduce",
    };
    if !msg.is_empty() {
        writeln!(&mut stderr(), "{}", msg).ok();
    }
    writeln!(
        &mut stderr(),
        "Usage: {leaf} induce [-n <order>|-u] [-f <min frequency>] [-c] [-o <grammar>] <corpus>
       {leaf} emit <grammar>
       {leaf} parse [-c] <grammar> <corpus>
       {leaf} eval [-x] [-c] [-w <weights corpus>] <grammar> <corpus>
Common options: -v (verbose logging), -h (help)"
    )
    .ok();
    process::exit(1);
}

/// Report `e`, which occurred while dealing with `path`, and exit.
fn fail<E: Display>(path: &str, e: E) -> ! {
    writeln!(&mut stderr(), "{}: {}", path, e).ok();
    process::exit(1);
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn corpus_mode(matches: &Matches) -> CorpusMode {
    if matches.opt_present("c") {
        CorpusMode::Tags
    } else {
        CorpusMode::TokenTag
    }
}

fn read_corpus(matches: &Matches, path: &str) -> Vec<Vec<String>> {
    read_corpus_file(path, corpus_mode(matches)).unwrap_or_else(|e| fail(path, e))
}

fn load_grammar(path: &str) -> Grammar {
    Grammar::load(path).unwrap_or_else(|e| fail(path, e))
}

fn compile(path: &str, grm: &Grammar) -> Parser {
    let pgs = ParserGrammarSource::from_grammar(grm).unwrap_or_else(|e| fail(path, e));
    Parser::compile(&pgs).unwrap_or_else(|e| fail(path, e))
}

fn induce(prog: &str, matches: &Matches) {
    if matches.free.len() != 2 {
        usage(prog, "induce takes exactly one corpus.");
    }
    let order = match (matches.opt_str("n"), matches.opt_present("u")) {
        (Some(_), true) => usage(prog, "-n and -u are mutually exclusive."),
        (None, true) => NgramOrder::Unbounded,
        (None, false) => NgramOrder::Bounded(2),
        (Some(s), false) => match s.parse() {
            Ok(n) => NgramOrder::Bounded(n),
            Err(_) => usage(prog, &format!("Invalid n-gram order '{}'.", s)),
        },
    };
    let mut inducer = Inducer::new().max_order(order);
    if let Some(s) = matches.opt_str("f") {
        match s.parse() {
            Ok(f) => inducer = inducer.min_frequency(f),
            Err(_) => usage(prog, &format!("Invalid minimum frequency '{}'.", s)),
        }
    }

    let corpus_path = &matches.free[1];
    let corpus = read_corpus(matches, corpus_path);
    let grm = inducer
        .induce(&corpus)
        .unwrap_or_else(|e| usage(prog, &e.to_string()));
    match matches.opt_str("o") {
        Some(p) => grm.save(&p).unwrap_or_else(|e| fail(&p, e)),
        None => print!("{}", grm.to_cfg_text()),
    }
}

fn emit(prog: &str, matches: &Matches) {
    if matches.free.len() != 2 {
        usage(prog, "emit takes exactly one grammar.");
    }
    let grm_path = &matches.free[1];
    let pgs = ParserGrammarSource::from_grammar(&load_grammar(grm_path))
        .unwrap_or_else(|e| fail(grm_path, e));
    println!("{}", pgs.lexer());
    print!("{}", pgs.grammar());
}

fn parse(prog: &str, matches: &Matches) {
    if matches.free.len() != 3 {
        usage(prog, "parse takes a grammar and a corpus.");
    }
    let grm_path = &matches.free[1];
    let parser = compile(grm_path, &load_grammar(grm_path));
    let corpus = read_corpus(matches, &matches.free[2]);
    for (i, sentence) in corpus.iter().enumerate() {
        let input = sentence.join(SEPARATOR);
        match parser.parse(&input) {
            Ok(tree) => print!("{}", tree.pp(parser.grammar(), &input)),
            Err(e) => println!("{}: sentence {}: {}", &matches.free[2], i + 1, e),
        }
    }
}

fn eval(prog: &str, matches: &Matches) {
    if matches.free.len() != 3 {
        usage(prog, "eval takes a grammar and a corpus.");
    }
    let grm_path = &matches.free[1];
    let parser = compile(grm_path, &load_grammar(grm_path));
    let test_path = &matches.free[2];
    let test = read_corpus(matches, test_path);
    let freqs = matches
        .opt_str("w")
        .map(|p| Frequencies::from_sentences(&read_corpus(matches, &p)));
    let weights = match freqs {
        Some(ref f) => WeightSource::Corpus(f),
        None => WeightSource::TestSet,
    };
    let mode = if matches.opt_present("x") {
        ScoreMode::Exhaustive
    } else {
        ScoreMode::Fast
    };
    let ev = Scorer::new(mode)
        .evaluate(&parser, &test, weights)
        .unwrap_or_else(|e| fail(test_path, e));
    println!("Precision: {:.6}", ev.precision);
    println!("Dispersion: {:.6}", ev.dispersion);
    println!(
        "Full: {}, partial: {}, poor: {} (of {})",
        ev.full,
        ev.partial,
        ev.poor,
        ev.coverages.len()
    );
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let prog = &args[0];
    let matches = match Options::new()
        .optflag("h", "help", "")
        .optflag("v", "verbose", "Log progress to stderr")
        .optflag(
            "c",
            "tags",
            "Corpus lines are plain tags rather than token_TAG words",
        )
        .optopt(
            "n",
            "order",
            "Longest n-gram considered when inducing (default: 2)",
            "N",
        )
        .optflag("u", "unbounded", "Consider n-grams of any length")
        .optopt(
            "f",
            "min-frequency",
            "Occurrences an n-gram needs to become a non-terminal (default: 2)",
            "MINFREQ",
        )
        .optopt("o", "output", "Write the grammar here rather than to stdout", "OUT")
        .optflag(
            "x",
            "exhaustive",
            "Score the longest parseable window rather than prefix",
        )
        .optopt(
            "w",
            "weights",
            "Weight scores by this corpus's frequencies (default: the test corpus's)",
            "CORPUS",
        )
        .parse(&args[1..])
    {
        Ok(m) => m,
        Err(f) => usage(prog, f.to_string().as_str()),
    };

    if matches.opt_present("h") {
        usage(prog, "");
    }

    init_tracing(matches.opt_present("v"));

    match matches.free.first().map(String::as_str) {
        Some("induce") => induce(prog, &matches),
        Some("emit") => emit(prog, &matches),
        Some("parse") => parse(prog, &matches),
        Some("eval") => eval(prog, &matches),
        Some(c) => usage(prog, &format!("Unknown command '{}'.", c)),
        None => usage(prog, "No command given."),
    }
}
