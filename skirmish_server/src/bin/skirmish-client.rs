// Interactive terminal client for a Skirmish server.
//
// Prints server lines as they arrive: prompts without a trailing newline,
// countdowns overwritten in place with `\r`, everything else one per line.
// Each line typed on stdin is sent as-is. Exits when the server announces
// shutdown or the end of the battle, or closes the connection.

use std::io::{self, BufRead, Write};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;

use clap::Parser;
use skirmish_protocol::ServerLine;
use skirmish_server::client::LineClient;

#[derive(Parser, Debug)]
#[command(name = "skirmish-client", about = "Connect to a Skirmish battle server")]
struct Args {
    /// Server host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(long, default_value_t = 5050)]
    port: u16,
}

fn main() {
    let args = Args::parse();
    let addr = match resolve(&args.host, args.port) {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Cannot resolve {}:{}: {e}", args.host, args.port);
            std::process::exit(1);
        }
    };
    let mut client = match LineClient::connect(addr) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to connect to {addr}: {e}");
            std::process::exit(1);
        }
    };

    // Stdin is read on its own thread so output keeps flowing while the
    // player is typing.
    let (input_tx, input_rx) = std::sync::mpsc::channel::<String>();
    let _ = thread::Builder::new().name("stdin".into()).spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if input_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut stdout = io::stdout();
    loop {
        while let Ok(line) = input_rx.try_recv() {
            if let Err(e) = client.send_line(&line) {
                eprintln!("\nConnection lost: {e}");
                return;
            }
        }

        match client.recv_timeout(Duration::from_millis(100)) {
            Ok(line) => {
                render(&mut stdout, &line);
                if line.is_terminal() {
                    return;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                println!("\nConnection closed by server.");
                return;
            }
        }
    }
}

fn render(out: &mut impl Write, line: &ServerLine) {
    let _ = match line {
        ServerLine::Prompt(text) => write!(out, "{text}"),
        ServerLine::Countdown(text) => write!(out, "\r{text}"),
        ServerLine::Shutdown(text) | ServerLine::Text(text) => writeln!(out, "{text}"),
    };
    let _ = out.flush();
}

fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address found"))
}
