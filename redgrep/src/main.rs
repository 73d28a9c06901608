// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>
//! CLI wrapper (§6.3, §10.5): loads the grammar table and the spec file,
//! runs the DSL front end, the core pipeline, and code generation, then
//! writes the result. Argument parsing follows the teacher's own
//! `structopt`-over-`clap` setup (`alap_gen_ng/src/main.rs`); the nested
//! `match ... { Ok -> continue, Err -> report and exit }` shape for each
//! pipeline stage is the same one the teacher uses around
//! `grammar::Specification::new`/`Grammar::try_from`.

use std::fs;
use std::io::{stderr, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

use clap::crate_authors;
use lazy_static::lazy_static;
use regex::Regex;
use structopt::StructOpt;

use redgrep::compile_rules;
use redgrep::dsl;
use redgrep::errors::ConfigError;
use redgrep::grammar::{Lr1Table, RawTable};
use redgrep::item_matcher::ItemMatcher;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "redgrep",
    about = "Compiles a pattern-matching DSL over LR(1) parser-stack states into a DFA",
    author = crate_authors!(),
)]
struct CLOptions {
    /// Output file path (default: the specification path with its
    /// extension changed to `.rs`).
    #[structopt(short = "o", parse(from_os_str))]
    output: Option<PathBuf>,
    /// Path to the compiled LR(1) grammar table (§6.1).
    #[structopt(short = "g", parse(from_os_str))]
    grammar: Option<PathBuf>,
    /// Suppress informational output.
    #[structopt(short = "q")]
    quiet: bool,
    /// Parse only; produce no output file.
    #[structopt(short = "n")]
    no_output: bool,
    /// Dump the parsed clause tree to stderr.
    #[structopt(short = "d")]
    dump_parsetree: bool,
    /// Print the version and exit.
    #[structopt(short = "v", long = "version")]
    version: bool,
    /// Print the version number only and exit.
    #[structopt(long = "vnum")]
    version_number: bool,
    /// The specification file (§6.2).
    #[structopt(parse(from_os_str))]
    specification: Option<PathBuf>,
}

const VERSION: &str = env!("CARGO_PKG_VERSION");

lazy_static! {
    /// A line containing only `%%`, possibly with surrounding whitespace:
    /// the section separator between the user's header/trailer blocks and
    /// the DSL rule text (§6.4), in the spirit of the classic lex/yacc
    /// three-section source file.
    static ref SECTION_MARKER: Regex = Regex::new(r"(?m)^[ \t]*%%[ \t]*\r?\n").unwrap();
}

/// Splits a spec file into `(header, rule text, trailer)` on up to two
/// `%%` marker lines. A file with no marker is taken to be all rule text,
/// with empty header and trailer.
fn split_sections(source: &str) -> (&str, &str, &str) {
    let mut matches = SECTION_MARKER.find_iter(source);
    let first = match matches.next() {
        Some(m) => m,
        None => return ("", source, ""),
    };
    let header = &source[..first.start()];
    let rest = &source[first.end()..];
    match SECTION_MARKER.find(rest) {
        Some(second) => (header, &rest[..second.start()], &rest[second.end()..]),
        None => (header, rest, ""),
    }
}

fn with_changed_extension(path: &Path, new_extension: &str) -> PathBuf {
    let mut new_path = PathBuf::new();
    if let Some(dir) = path.parent() {
        new_path.push(dir);
    }
    new_path.push(path.file_stem().unwrap_or_default());
    new_path.set_extension(new_extension);
    new_path
}

fn load_grammar(path: &Path) -> Result<Lr1Table, ConfigError> {
    let file =
        fs::File::open(path).map_err(|e| ConfigError::UnreadablePath(path.to_path_buf(), e))?;
    let raw = RawTable::from_reader(std::io::BufReader::new(file))?;
    Lr1Table::from_raw(raw)
}

fn die(code: i32, message: impl std::fmt::Display) -> ! {
    writeln!(stderr(), "{}", message).expect("stderr is writable");
    exit(code);
}

fn main() {
    let opts = CLOptions::from_args();

    if opts.version {
        println!("redgrep {}", VERSION);
        exit(0);
    }
    if opts.version_number {
        println!("{}", VERSION);
        exit(0);
    }

    let spec_path = opts
        .specification
        .clone()
        .unwrap_or_else(|| die(1, "missing argument: specification file"));

    let grammar_path = opts
        .grammar
        .clone()
        .unwrap_or_else(|| die(1, "missing argument: -g <grammar table path>"));

    let table = load_grammar(&grammar_path).unwrap_or_else(|e| die(2, e));

    let source_text =
        fs::read_to_string(&spec_path).unwrap_or_else(|e| {
            die(
                2,
                ConfigError::UnreadablePath(spec_path.clone(), e),
            )
        });
    let (header, body, trailer) = split_sections(&source_text);

    let ast = dsl::parser::parse(body.to_string(), &spec_path.to_string_lossy())
        .unwrap_or_else(|e| die(3, e));

    if opts.dump_parsetree {
        eprintln!("{:#?}", ast);
    }

    if opts.no_output {
        exit(0);
    }

    let matcher = ItemMatcher::new(&table);
    let resolved = dsl::resolve(&table, &matcher, &ast).unwrap_or_else(|e| die(1, e));
    let compiled = compile_rules(&table, &resolved).unwrap_or_else(|e| die(1, e));

    let output_path = opts
        .output
        .clone()
        .unwrap_or_else(|| with_changed_extension(&spec_path, "rs"));
    let mut out = fs::File::create(&output_path).unwrap_or_else(|e| {
        die(2, ConfigError::UnwritablePath(output_path.clone(), e))
    });
    redgrep::codegen::write_output(&mut out, header, &compiled, trailer)
        .unwrap_or_else(|e| die(2, ConfigError::UnwritablePath(output_path.clone(), e)));

    if !opts.quiet {
        eprintln!("wrote {}", output_path.display());
    }
}
