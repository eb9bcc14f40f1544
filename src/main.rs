use clap::Parser;
use connvault::cli::commands::save::SaveOptions;
use connvault::cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging.
///
/// Always logs to stderr: stdout carries the MCP protocol under
/// `serve` and command output otherwise.
fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .compact(),
        )
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();

    init_logging(match cli.command {
        Commands::Serve => "info",
        _ => "warn",
    });

    let result = match cli.command {
        Commands::Serve => connvault::cli::commands::serve::execute(&cli),
        Commands::Save {
            ref project,
            ref connection,
            ref host,
            port,
            ref database,
            ref username,
            ref password,
            ref connection_type,
            no_ssl,
            read_write,
            ref params,
        } => connvault::cli::commands::save::execute(
            &cli,
            SaveOptions {
                project,
                connection,
                host,
                port,
                database,
                username,
                password: password.as_deref(),
                connection_type,
                no_ssl,
                read_write,
                params,
            },
        ),
        Commands::Get {
            ref project,
            ref connection,
            show_password,
        } => connvault::cli::commands::get::execute(&cli, project, connection, show_password),
        Commands::List { ref project } => {
            connvault::cli::commands::list::execute(&cli, project.as_deref())
        }
        Commands::Delete {
            ref project,
            ref connection,
            force,
        } => connvault::cli::commands::delete::execute(&cli, project, connection, force),
        Commands::Test {
            ref project,
            ref connection,
        } => connvault::cli::commands::test::execute(&cli, project, connection),
        Commands::Keygen => connvault::cli::commands::keygen::execute(),
    };

    if let Err(e) = result {
        connvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
