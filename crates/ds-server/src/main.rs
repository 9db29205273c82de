mod dispatch;
mod tcp;
mod udp;

use clap::Parser;
use ds_store::Store;

/// Directory Server: registers users, maintains discussion groups, and
/// serves their message logs over a shared UDP/TCP port.
#[derive(Debug, Parser)]
#[command(name = "DS")]
struct Cli {
    /// Port shared by the UDP and TCP listeners.
    #[arg(short = 'p', long = "port", default_value_t = ds_proto::tags::DEFAULT_PORT)]
    port: u16,

    /// Verbose logging of request origin and command.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let root = std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("Error: cannot read working directory: {e}");
        std::process::exit(1);
    });

    let store = Store::open(&root).await.unwrap_or_else(|e| {
        eprintln!("Error: cannot initialize store at {}: {e}", root.display());
        std::process::exit(1);
    });

    log::info!("store rooted at {}", root.display());

    if let Err(e) = dispatch::run(store, cli.port).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
