use clap::Parser;
use keycraft::cli::commands;
use keycraft::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    // Diagnostics go to stderr so `serve` keeps stdout for responses.
    let filter = EnvFilter::try_from_env("KEYCRAFT_LOG")
        .unwrap_or_else(|_| EnvFilter::new("keycraft=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli),
        Commands::Add {
            ref meta,
            ref value,
        } => commands::add::execute(&cli, meta.clone(), value.clone()),
        Commands::Update {
            ref id,
            ref meta,
            ref value,
            new_secret,
        } => commands::update::execute(&cli, id, meta.clone(), value.clone(), new_secret),
        Commands::List => commands::list::execute(&cli),
        Commands::Show { ref id } => commands::show::execute(&cli, id),
        Commands::Reveal { ref id, stdout } => commands::reveal::execute(&cli, id, stdout),
        Commands::Delete { ref id, force } => commands::delete::execute(&cli, id, force),
        Commands::Serve => commands::serve::execute(&cli),
        Commands::Audit { last, ref since } => {
            commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
        Commands::Completions { shell } => commands::completions::execute(shell),
        Commands::Version => commands::version::execute(),
    };

    if let Err(e) = result {
        keycraft::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
