use crate::demo::{run_chat, run_demo, ChatArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use job_assistant::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Job Search Assistant",
    about = "Run the conversational job-search assistant as a service or from the terminal",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Hold an interactive conversation on stdin/stdout
    Chat(ChatArgs),
    /// Play a scripted conversation end to end and print every turn
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Posting catalogue CSV (defaults to ASSISTANT_POSTINGS_CSV or the built-in sample)
    #[arg(long)]
    pub(crate) postings: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Chat(args) => run_chat(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
