use clap::Parser;
use errand::agent;
use errand::config::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Errand - sandboxed single-shot Gemini agent", long_about = None)]
struct Cli {
    /// The prompt to send to the model
    user_prompt: String,

    /// Print the prompt, token counts, and tool invocation detail
    #[arg(long)]
    verbose: bool,

    /// Working directory all tool access is confined to (default: configured root, then ".")
    #[arg(short = 'w', long)]
    working_dir: Option<PathBuf>,

    /// Model name override
    #[arg(short, long)]
    model: Option<String>,

    /// Config file path (default: ./errand.yml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let mut config = Config::discover(args.config.as_deref())?;
    if let Some(working_dir) = args.working_dir {
        config.sandbox.root = working_dir;
    }
    if let Some(model) = args.model {
        config.gemini.model = model;
    }

    agent::run_once(&config, &args.user_prompt, args.verbose).await
}
