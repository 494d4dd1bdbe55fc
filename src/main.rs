use clap::{Parser, Subcommand};
use resolve_json::cli::{self, CliError, ResolveOptions};
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "resolve-json")]
#[command(about = "Resolve references, variables, transforms and resources embedded in JSON")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a document and print the result
    Resolve {
        /// JSON document (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// JSON object of variable bindings
        #[arg(long)]
        vars: Option<String>,

        /// Only print the value at this location, e.g. `a/b/0`
        #[arg(long)]
        at: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Resolve resource nodes (without --fetch they stay null)
        #[arg(long = "async")]
        asynchronous: bool,

        /// Fetch resources over HTTP (implies --async)
        #[arg(long)]
        fetch: bool,

        /// Prefix for resource paths that start with `/`
        #[arg(long, requires = "fetch")]
        base_url: Option<String>,

        /// Merge xf_inherit / xf_extend lists before resolving
        #[arg(long)]
        extend: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve {
            input,
            vars,
            at,
            pretty,
            asynchronous,
            fetch,
            base_url,
            extend,
        } => {
            let options = ResolveOptions {
                input,
                vars,
                at,
                asynchronous,
                fetch,
                base_url,
                extend,
            };
            run_resolve(options, pretty).await
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run_resolve(mut options: ResolveOptions, pretty: bool) -> Result<(), CliError> {
    if options.input.is_none() && !atty::is(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        options.input = Some(buffer);
    }

    let output = cli::execute_resolve(&options).await?;
    let json = if pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }?;
    println!("{}", json);
    Ok(())
}
