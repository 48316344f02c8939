use crate::infra::{build_assistant, ApiAssistant, InMemorySessionRepository};
use clap::Args;
use job_assistant::config::AppConfig;
use job_assistant::error::AppError;
use job_assistant::telemetry;
use job_assistant::workflows::job_search::{MatchView, SessionId, TurnOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_SCRIPT: [&str; 4] = ["我想找Python开发的工作", "深圳", "15-20K", "谢谢"];

const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", "退出"];

#[derive(Args, Debug, Default)]
pub(crate) struct ChatArgs {
    /// Posting catalogue CSV (defaults to ASSISTANT_POSTINGS_CSV or the built-in sample)
    #[arg(long)]
    pub(crate) postings: Option<PathBuf>,
    /// Number of postings to show once the search runs
    #[arg(long)]
    pub(crate) results: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Posting catalogue CSV (defaults to ASSISTANT_POSTINGS_CSV or the built-in sample)
    #[arg(long)]
    pub(crate) postings: Option<PathBuf>,
    /// Number of postings to show once the search runs
    #[arg(long)]
    pub(crate) results: Option<usize>,
    /// Replace the scripted user messages (repeat the flag once per turn)
    #[arg(long = "say")]
    pub(crate) script: Vec<String>,
    /// Print the final session snapshot as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

fn prepare(
    postings: Option<PathBuf>,
    results: Option<usize>,
) -> Result<(ApiAssistant, Arc<InMemorySessionRepository>), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(postings) = postings {
        config.assistant.postings_csv = Some(postings);
    }
    if let Some(results) = results.filter(|value| *value > 0) {
        config.assistant.result_limit = results;
    }

    telemetry::init(&config.telemetry)?;

    let sessions = Arc::new(InMemorySessionRepository::default());
    let assistant = build_assistant(&config, sessions.clone())?;
    Ok((assistant, sessions))
}

pub(crate) async fn run_chat(args: ChatArgs) -> Result<(), AppError> {
    let (assistant, _) = prepare(args.postings, args.results)?;
    let start = assistant.start_conversation()?;
    println!("助手: {}", start.greeting);
    println!("(输入 exit 退出，输入“重新开始”重置对话)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if EXIT_COMMANDS.contains(&text) {
            break;
        }

        let outcome = assistant.process_turn(&start.session_id, text).await?;
        print_outcome(&outcome);
    }

    assistant.close_conversation(&start.session_id).await?;
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let (assistant, sessions) = prepare(args.postings, args.results)?;
    let script = if args.script.is_empty() {
        DEFAULT_SCRIPT.iter().map(|text| text.to_string()).collect()
    } else {
        args.script
    };

    let start = assistant.start_conversation()?;
    println!("=== Job Search Assistant Demo ===");
    println!("Session: {}", start.session_id);
    println!("助手: {}", start.greeting);

    for text in &script {
        println!();
        println!("用户: {text}");
        let outcome = assistant.process_turn(&start.session_id, text).await?;
        print_outcome(&outcome);
    }

    render_summary(&assistant, &start.session_id, sessions.len(), args.json)
}

fn print_outcome(outcome: &TurnOutcome) {
    println!("助手: {}", outcome.response_text);
    println!(
        "      [stage: {} | progress: {:.0}% | missing: {}]",
        outcome.stage.label(),
        outcome.progress.percentage,
        if outcome.missing_fields.is_empty() {
            "none".to_string()
        } else {
            outcome
                .missing_fields
                .iter()
                .map(|field| field.name())
                .collect::<Vec<_>>()
                .join(", ")
        }
    );
}

fn render_summary(
    assistant: &ApiAssistant,
    session_id: &SessionId,
    open_sessions: usize,
    as_json: bool,
) -> Result<(), AppError> {
    let record = assistant.session(session_id)?;

    if as_json {
        let snapshot = job_assistant::workflows::job_search::SessionView::from(record);
        match serde_json::to_string_pretty(&snapshot) {
            Ok(body) => println!("{body}"),
            Err(err) => eprintln!("failed to serialize session snapshot: {err}"),
        }
        return Ok(());
    }

    println!();
    println!("=== Summary ===");
    println!("Open sessions: {open_sessions}");
    println!("Final stage: {}", record.state.stage().label());
    println!("Turns recorded: {}", record.state.history().len());
    render_matches(&record.last_matches);
    Ok(())
}

fn render_matches(matches: &[MatchView]) {
    if matches.is_empty() {
        println!("No postings matched.");
        return;
    }

    println!("Matches:");
    for view in matches {
        println!(
            "  {}. [{}] {} @ {} ({}) score={:.2} match={}",
            view.rank,
            view.id,
            view.title,
            view.company,
            view.salary,
            view.score,
            view.match_type
        );
        if !view.education.is_empty() || !view.experience.is_empty() {
            println!("     education={} experience={}", view.education, view.experience);
        }
    }
}
