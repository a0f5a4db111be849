// CLI entry point for the Skirmish battle server.
//
// Runs a single session: lobby, setup, battle, then exits. See `server.rs`
// for the phase sequencing and `config.rs` for every option.
//
// Usage:
//   skirmish-server [OPTIONS]
//     --config <FILE>         JSON config file (partial files are fine)
//     --host <HOST>           Interface to bind (default: 0.0.0.0)
//     --port <PORT>           Listen port (default: 5050)
//     --max-players <N>       Lobby capacity (default: 6)
//     --min-players <N>       Players needed to start (default: 2)
//     --lobby-seconds <N>     Countdown length (default: 5)
//     --seed <N>              Fixed dice seed
//     --log-level <LEVEL>     Tracing filter (default: info)

use clap::Parser;
use tracing::{error, info};

use skirmish_server::logging::init_logging;
use skirmish_server::{CliArgs, start_server};

fn main() {
    let args = CliArgs::parse();
    let config = match args.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    init_logging(&config.log_level);

    let (handle, addr) = match start_server(config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };
    println!("Server listening on {addr}");

    match handle.wait() {
        Ok(summary) => info!(end = ?summary.end, "server exiting"),
        Err(e) => {
            error!(error = %e, "session failed");
            std::process::exit(1);
        }
    }
}
