use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use gitjot::settings::Settings;
use gitjot::{Git2, LogEntry, Mutation, Published, SyncConfig};

#[derive(Parser)]
#[command(
    name = "gitjot",
    version,
    about = "Pull a git repository, prepend a log entry and push it back"
)]
struct Cli {
    #[command(flatten)]
    sync: SyncArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SyncArgs {
    /// JSON settings file; environment and flags override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Remote repository URI
    #[arg(long, env = "GITJOT_REMOTE", global = true)]
    remote: Option<String>,

    /// Local working copy directory
    #[arg(long, env = "GITJOT_LOCAL_PATH", global = true)]
    local: Option<PathBuf>,

    /// Branch to pull and push [default: master]
    #[arg(long, env = "GITJOT_BRANCH", global = true)]
    branch: Option<String>,

    /// Username for authenticated remotes
    #[arg(long, env = "GITJOT_USERNAME", global = true)]
    username: Option<String>,

    /// Password or token for authenticated remotes
    #[arg(long, env = "GITJOT_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Commit message [default: "Update on : <timestamp>"]
    #[arg(short, long, global = true)]
    message: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone or pull the working copy without changing it
    Sync,

    /// Prepend a titled entry to a file and publish it
    Prepend {
        /// Entry heading
        #[arg(short, long)]
        title: String,

        /// File to prepend to, relative to the working copy
        #[arg(short, long, default_value = gitjot::mutate::README)]
        file: PathBuf,

        /// One bullet per message, in order
        #[arg(required = true)]
        messages: Vec<String>,
    },

    /// Replace a file's content and publish it
    Rewrite {
        /// File to rewrite, relative to the working copy
        file: PathBuf,

        /// New content
        #[arg(long, conflicts_with = "from", required_unless_present = "from")]
        content: Option<String>,

        /// Read the new content from this file
        #[arg(long)]
        from: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sync => cmd_sync(cli.sync),
        Commands::Prepend {
            title,
            file,
            messages,
        } => cmd_prepend(cli.sync, title, file, messages),
        Commands::Rewrite {
            file,
            content,
            from,
        } => cmd_rewrite(cli.sync, file, content, from),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(args: SyncArgs) -> Result<SyncConfig, Box<dyn std::error::Error>> {
    let file = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let flags = Settings {
        remote_uri: args.remote,
        local_path: args.local,
        branch: args.branch,
        username: args.username,
        password: args.password,
        commit_message: args.message,
    };

    Ok(file.overlay(flags).into_builder().build()?)
}

fn cmd_sync(args: SyncArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args)?;

    let handle = gitjot::acquire(&Git2, &config)?;
    println!(
        "{} is up to date with {} ({})",
        handle.workdir().display(),
        config.remote_uri(),
        config.branch()
    );
    handle.close()?;

    Ok(())
}

fn cmd_prepend(
    args: SyncArgs,
    title: String,
    file: PathBuf,
    messages: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args)?;
    let mutation = Mutation::Prepend {
        path: file,
        entry: LogEntry::new(title, messages),
    };

    let published = gitjot::run(&Git2, &config, &[mutation])?;
    print_published(&published);

    Ok(())
}

fn cmd_rewrite(
    args: SyncArgs,
    file: PathBuf,
    content: Option<String>,
    from: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args)?;
    let content = match (content, from) {
        (Some(content), _) => content,
        (None, Some(from)) => std::fs::read_to_string(&from)
            .map_err(|e| format!("failed to read {}: {}", from.display(), e))?,
        (None, None) => return Err("either --content or --from is required".into()),
    };

    let published = gitjot::run(&Git2, &config, &[Mutation::Rewrite { path: file, content }])?;
    print_published(&published);

    Ok(())
}

fn print_published(published: &Published) {
    println!("Published successfully");
    println!("  Branch: {}", published.branch);
    println!(
        "  Commit: {}",
        if published.commit.len() > 12 {
            &published.commit[..12]
        } else {
            &published.commit
        }
    );
}
