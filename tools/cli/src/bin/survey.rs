use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use survey_core::{
    EngineConfig, GraphStats, Response, ReviewItem, RunTrace, Selection, SessionStatus,
    StateDigest, SurveyDocument, SurveyError, SurveyGraph, SurveySession, SurveyView,
    TextRenderer, DOCUMENT_VERSION,
};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::{info, Level};

const TRACE_FORMAT_VERSION: u16 = 1;

#[derive(Parser)]
#[command(author, version, about = "Branching survey CLI")]
struct Cli {
    /// Engine configuration file (TOML). Defaults apply when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log more (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a survey document and report authoring issues.
    Validate { document: PathBuf },
    /// Print graph statistics and a node overview.
    Stats { document: PathBuf },
    /// Run a survey interactively on the terminal.
    Run { document: PathBuf },
    /// Play scripted answers and write the run trace as YAML.
    Trace {
        document: PathBuf,
        /// Steps separated by `;`, e.g. "1;2,3;o text;s;b".
        #[arg(short, long)]
        answers: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Import then export a document, regenerating ids and link texts.
    Normalize {
        document: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Write the JSON Schema of the survey document format.
    Schema {
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct TraceEnvelope {
    trace_format_version: u16,
    document_version: String,
    trace: RunTrace,
}

#[derive(Tabled)]
struct IssueRow {
    code: String,
    node: String,
    issue: String,
}

#[derive(Tabled)]
struct StatRow {
    metric: &'static str,
    value: usize,
}

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "#")]
    position: usize,
    id: String,
    kind: &'static str,
    preview: String,
    answers: usize,
    links: usize,
}

#[derive(Tabled)]
struct ReviewRow {
    #[tabled(rename = "#")]
    position: usize,
    question: String,
    answer: String,
}

/// One parsed respondent input.
#[derive(Clone, Debug, PartialEq)]
enum Action {
    Answer(Vec<Selection>),
    Continue,
    Skip,
    Back,
    Restart,
    Quit,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Prints library errors through miette so that spans into the document show.
fn report(err: anyhow::Error) {
    let summary = err.to_string();
    match err.downcast::<SurveyError>() {
        Ok(survey_err) => {
            let report = miette::Report::new(survey_err);
            if summary != report.to_string() {
                eprintln!("error: {summary}");
            }
            eprintln!("{report:?}");
        }
        Err(err) => eprintln!("error: {err:?}"),
    }
}

fn execute(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Validate { document } => validate_document(&document),
        Command::Stats { document } => print_stats(&document, &config),
        Command::Run { document } => run_interactive(&document, config),
        Command::Trace {
            document,
            answers,
            output,
        } => trace_document(&document, &answers, &output, config),
        Command::Normalize { document, output } => normalize_document(&document, &output),
        Command::Schema { output } => write_schema(&output),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_graph(path: &Path) -> Result<SurveyGraph> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let graph = SurveyGraph::from_json(&raw)?;
    Ok(graph)
}

fn write_output(path: &Path, payload: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, payload).with_context(|| format!("write {}", path.display()))
}

fn validate_document(path: &Path) -> Result<()> {
    let graph = load_graph(path)?;
    let issues = graph.validate();
    if issues.is_empty() {
        println!("{}: {} nodes, no issues", path.display(), graph.len());
        return Ok(());
    }
    let rows: Vec<IssueRow> = issues
        .iter()
        .map(|issue| IssueRow {
            code: issue.code().to_string(),
            node: issue.node().to_string(),
            issue: issue.to_string(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!("{} issue(s) in {}", issues.len(), path.display());
    Ok(())
}

fn stat_rows(stats: &GraphStats) -> Vec<StatRow> {
    vec![
        StatRow {
            metric: "nodes",
            value: stats.total_nodes,
        },
        StatRow {
            metric: "questions",
            value: stats.questions,
        },
        StatRow {
            metric: "notifications",
            value: stats.notifications,
        },
        StatRow {
            metric: "multiple choice",
            value: stats.multiple_choice,
        },
        StatRow {
            metric: "rules",
            value: stats.rules,
        },
        StatRow {
            metric: "links",
            value: stats.links,
        },
        StatRow {
            metric: "reachable",
            value: stats.reachable_nodes,
        },
        StatRow {
            metric: "unreachable",
            value: stats.unreachable_nodes,
        },
    ]
}

fn print_stats(path: &Path, config: &EngineConfig) -> Result<()> {
    let graph = load_graph(path)?;
    if !graph.title().is_empty() {
        println!("{}", graph.title());
    }
    println!("{}", Table::new(stat_rows(&graph.stats())).with(Style::rounded()));

    let rows: Vec<NodeRow> = graph
        .nodes()
        .iter()
        .enumerate()
        .map(|(index, node)| NodeRow {
            position: index + 1,
            id: node.id.to_string(),
            kind: if node.is_notification() {
                "notification"
            } else if node.is_multiple() {
                "multiple"
            } else {
                "single"
            },
            preview: graph
                .preview(node.id, config.preview_chars)
                .unwrap_or_default(),
            answers: node.answers.len(),
            links: node.outgoing().len(),
        })
        .collect();
    if !rows.is_empty() {
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
    Ok(())
}

fn review_table(items: &[ReviewItem]) -> String {
    let rows: Vec<ReviewRow> = items
        .iter()
        .map(|item| ReviewRow {
            position: item.position,
            question: item.question.clone(),
            answer: item.answer.clone(),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Parses one input line. Answer numbers are 1-based; `o text` picks the
/// free-text answer.
fn parse_action(input: &str, other_index: Option<usize>) -> Result<Action> {
    let input = input.trim();
    match input {
        "" => return Ok(Action::Continue),
        "s" | "skip" => return Ok(Action::Skip),
        "b" | "back" => return Ok(Action::Back),
        "r" | "restart" => return Ok(Action::Restart),
        "q" | "quit" => return Ok(Action::Quit),
        _ => {}
    }
    let mut selections = Vec::new();
    for token in input.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        if let Some(text) = token.strip_prefix("o ").or((token == "o").then_some("")) {
            let index = other_index.ok_or_else(|| anyhow!("this question has no free-text answer"))?;
            selections.push(Selection::other(index, text.trim()));
            continue;
        }
        let number: usize = token
            .parse()
            .with_context(|| format!("'{token}' is not an answer number"))?;
        if number == 0 {
            bail!("answers are numbered from 1");
        }
        selections.push(Selection::new(number - 1));
    }
    Ok(Action::Answer(selections))
}

fn other_index(view: &SurveyView) -> Option<usize> {
    match view {
        SurveyView::Question { options, .. } => options
            .iter()
            .find(|option| option.is_other)
            .map(|option| option.index),
        _ => None,
    }
}

/// Turns an action into a response for the node on display.
fn response_for(view: &SurveyView, selections: Vec<Selection>) -> Result<Response> {
    match view {
        SurveyView::Notification { .. } => Ok(Response::Acknowledge),
        SurveyView::Question { multiple: true, .. } => Ok(Response::multiple_with(selections)),
        SurveyView::Question { .. } => match <[Selection; 1]>::try_from(selections) {
            Ok([selection]) => Ok(Response::Single(selection)),
            Err(_) => bail!("pick exactly one answer"),
        },
        SurveyView::Idle | SurveyView::End { .. } => bail!("no question on display"),
    }
}

/// Applies one action. Returns `false` when the respondent quits.
fn apply_action(session: &mut SurveySession<'_, TextRenderer>, action: Action) -> Result<bool> {
    match action {
        Action::Quit => return Ok(false),
        Action::Restart => {
            session.restart()?;
        }
        Action::Back => {
            session.go_back()?;
        }
        Action::Skip => {
            session.skip()?;
        }
        Action::Continue => {
            if !matches!(session.view(), SurveyView::Notification { .. }) {
                bail!("enter an answer");
            }
            session.acknowledge()?;
        }
        Action::Answer(selections) => {
            let response = response_for(&session.view(), selections)?;
            session.submit(response)?;
        }
    }
    Ok(true)
}

fn run_interactive(path: &Path, config: EngineConfig) -> Result<()> {
    let graph = load_graph(path)?;
    let mut session = SurveySession::new(&graph, config, TextRenderer);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    if !graph.title().is_empty() {
        println!("== {} ==", graph.title());
    }
    println!("{}", session.start()?.text);

    while session.status() == SessionStatus::Running {
        if let Some(pending) = session.pending_auto_advance() {
            thread::sleep(pending.delay);
            if let Some(output) = session.fire_auto_advance(pending.ticket)? {
                println!("\n{}", output.text);
            }
            continue;
        }

        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("read stdin")?;
        let action = match parse_action(&line, other_index(&session.view())) {
            Ok(action) => action,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match apply_action(&mut session, action) {
            Ok(true) => println!("\n{}", session.render().text),
            Ok(false) => break,
            Err(err) => println!("{err}"),
        }
    }

    let review = session.review();
    if session.status() == SessionStatus::Ended && !review.is_empty() {
        println!("\n{}", review_table(&review));
    }
    Ok(())
}

fn trace_document(
    path: &Path,
    answers: &str,
    output: &Path,
    config: EngineConfig,
) -> Result<()> {
    let graph = load_graph(path)?;
    let mut session = SurveySession::new(&graph, config, TextRenderer);
    let mut trace = RunTrace::new(graph.title());

    session.start()?;
    trace.push(
        "start",
        session.view(),
        StateDigest::from_engine(session.engine()),
    );
    for step in answers.split(';') {
        let outcome = parse_action(step, other_index(&session.view()))
            .and_then(|action| apply_action(&mut session, action));
        let label = match outcome {
            Ok(false) => break,
            Ok(true) => step.trim().to_string(),
            Err(err) => format!("{} (rejected: {err})", step.trim()),
        };
        trace.push(label, session.view(), StateDigest::from_engine(session.engine()));
    }
    trace.review = session.review();

    let steps = trace.steps.len();
    let envelope = TraceEnvelope {
        trace_format_version: TRACE_FORMAT_VERSION,
        document_version: DOCUMENT_VERSION.to_string(),
        trace,
    };
    let yaml = serde_yaml::to_string(&envelope).context("serialize trace")?;
    write_output(output, &yaml)?;
    info!(steps, output = %output.display(), "trace written");
    Ok(())
}

fn normalize_document(path: &Path, output: &Path) -> Result<()> {
    let graph = load_graph(path)?;
    let json = graph.to_json()?;
    write_output(output, &json)
}

fn write_schema(output: &Path) -> Result<()> {
    let schema = serde_json::to_string_pretty(&SurveyDocument::schema())
        .context("serialize schema")?;
    write_output(output, &schema)
}
