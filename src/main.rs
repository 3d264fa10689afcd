use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::error;

use minidb::parser::Parser as SqlParser;
use minidb::script::{self, ScriptStatement};
use minidb::storage;
use minidb::tokenizer::Lexer;
use minidb::writer::ResultWriter;
use minidb::Engine;

/// Runs a SQL script against an in-memory database and writes query
/// results as CSV blocks.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// SQL script to execute.
    input: PathBuf,

    /// Output file receiving one CSV block per SELECT/INNER JOIN.
    output: PathBuf,

    /// Load this snapshot (.db) before running the script.
    #[arg(long)]
    load: Option<PathBuf>,

    /// Save the selected database to this snapshot (.db) afterwards.
    #[arg(long)]
    save: Option<PathBuf>,

    /// Name of the implicitly selected default database.
    #[arg(long, default_value = "main")]
    database: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let mut engine = match &args.load {
        Some(path) => {
            let database = storage::load(path)
                .with_context(|| format!("cannot load snapshot {}", path.display()))?;
            let mut engine = Engine::new();
            engine.attach(database)?;
            engine
        }
        None => Engine::with_default(&args.database),
    };

    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("cannot read script {}", args.input.display()))?;
    let out = fs::File::create(&args.output)
        .with_context(|| format!("cannot create output file {}", args.output.display()))?;
    let mut writer = ResultWriter::new(BufWriter::new(out));

    // A failed statement is reported with its line and the script
    // continues; only I/O setup above aborts the whole run.
    for statement in script::split_statements(&source)? {
        let start_line = statement.start_line;
        if let Err(e) = run_statement(&mut engine, &mut writer, statement) {
            error!(line = e.line().unwrap_or(start_line), "{}", e);
        }
    }
    writer.into_inner()?;

    if let Some(path) = &args.save {
        storage::save(engine.current()?, path)?;
    }

    Ok(())
}

/// Takes one statement through the lex → parse → execute pipeline and
/// hands any result set to the writer.
fn run_statement<W: Write>(
    engine: &mut Engine,
    writer: &mut ResultWriter<W>,
    statement: ScriptStatement,
) -> minidb::Result<()> {
    let tokens = Lexer::new(&statement.text, statement.start_line).tokenize()?;
    let Some(parsed) = SqlParser::new(tokens).parse()? else {
        return Ok(());
    };
    if let Some(result) = engine.execute(parsed)? {
        writer.write_result(&result)?;
    }
    Ok(())
}
