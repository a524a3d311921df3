//! hilite - highlight text queries in HTML documents

use std::fs;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use hilite::{Finder, HtmlHighlighter, Options, Subject};

#[derive(Parser)]
#[command(name = "hilite")]
#[command(version, about = "Highlight text queries in HTML documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Highlight queries and print the marked-up document
    Mark {
        /// Input HTML file
        file: String,

        /// Query string (repeatable)
        #[arg(short, long = "query", required = true)]
        queries: Vec<String>,

        /// Query set name
        #[arg(long, default_value = "search")]
        name: String,

        /// Treat queries as regular expressions
        #[arg(long)]
        regex: bool,

        /// Print a JSON report instead of the document
        #[arg(long)]
        json: bool,
    },

    /// List matches as JSON without printing the document
    Find {
        /// Input HTML file
        file: String,

        /// Query string (repeatable)
        #[arg(short, long = "query", required = true)]
        queries: Vec<String>,

        /// Treat queries as regular expressions
        #[arg(long)]
        regex: bool,
    },

    /// Print the flat text projection
    Text {
        /// Input HTML file
        file: String,
    },
}

type AnyResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Mark {
            file,
            queries,
            name,
            regex,
            json,
        } => mark(&file, &queries, &name, regex, json),
        Command::Find {
            file,
            queries,
            regex,
        } => find(&file, &queries, regex),
        Command::Text { file } => text(&file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn subjects(queries: &[String], regex: bool) -> Vec<Subject> {
    queries
        .iter()
        .map(|q| {
            if regex {
                Subject::Pattern(q.clone())
            } else {
                Subject::Literal(q.clone())
            }
        })
        .collect()
}

#[derive(Serialize)]
struct MarkReport {
    name: String,
    matches: u32,
    queries: u32,
    total: u32,
}

fn mark(file: &str, queries: &[String], name: &str, regex: bool, json: bool) -> AnyResult<()> {
    let html = fs::read_to_string(file)?;
    let mut hl = HtmlHighlighter::from_html(&html, Options::default())?;

    hl.add(name, subjects(queries, regex), true, None);
    hl.apply();

    if json {
        let stats = hl.stats();
        let report = MarkReport {
            name: name.to_string(),
            matches: hl.query_set(name).map_or(0, |s| s.length),
            queries: stats.queries,
            total: stats.total,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", hl.to_html());
    }
    Ok(())
}

#[derive(Serialize)]
struct PointReport {
    xpath: String,
    offset: usize,
}

#[derive(Serialize)]
struct MatchReport {
    offset: usize,
    length: usize,
    text: String,
    start: PointReport,
    end: PointReport,
}

fn find(file: &str, queries: &[String], regex: bool) -> AnyResult<()> {
    let html = fs::read_to_string(file)?;
    let hl = HtmlHighlighter::from_html(&html, Options::default())?;

    let mut matches = Vec::new();
    for subject in subjects(queries, regex) {
        let finder = Finder::new(hl.dom(), hl.container(), hl.content(), &subject)?;
        for range in finder {
            let xpath = range.compute_xpath(hl.dom(), hl.content(), hl.container())?;
            matches.push(MatchReport {
                offset: range.start_absolute(hl.content()),
                length: range.len(hl.content()),
                text: range.text(hl.content()).to_string(),
                start: PointReport {
                    xpath: xpath.start.xpath,
                    offset: xpath.start.offset,
                },
                end: PointReport {
                    xpath: xpath.end.xpath,
                    offset: xpath.end.offset,
                },
            });
        }
    }
    println!("{}", serde_json::to_string_pretty(&matches)?);
    Ok(())
}

fn text(file: &str) -> AnyResult<()> {
    let html = fs::read_to_string(file)?;
    let hl = HtmlHighlighter::from_html(&html, Options::default())?;
    println!("{}", hl.content().text());
    Ok(())
}
