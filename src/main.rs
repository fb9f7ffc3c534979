use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

mod app;
mod client;
mod game;
mod protocol;
mod room_runtime;
mod shared;
mod transport;

use app::config::GameConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
  Server,
  Client,
}

/// Authoritative multiplayer grid snake over WebSocket.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
  /// Run the game server or a terminal client
  #[arg(value_enum, default_value_t = Mode::Server)]
  mode: Mode,
  /// Address to bind (server) or connect to (client)
  #[arg(short = 'H', long, default_value = "127.0.0.1")]
  host: String,
  /// Port to listen on or connect to
  #[arg(short, long, default_value_t = 8081)]
  port: u16,
  /// Display name used by the client when joining
  #[arg(short, long, default_value = "Player")]
  name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let cli = Cli::parse();
  match cli.mode {
    Mode::Server => {
      let config = GameConfig::from_env()?;
      let address: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
      room_runtime::run_server(address, config).await
    }
    Mode::Client => {
      let url = format!("ws://{}:{}/ws", cli.host, cli.port);
      client::run_client(&url, &cli.name).await
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_to_local_server() {
    let cli = Cli::parse_from(["grid-snake-arena"]);
    assert_eq!(cli.mode, Mode::Server);
    assert_eq!(cli.host, "127.0.0.1");
    assert_eq!(cli.port, 8081);
  }

  #[test]
  fn client_mode_takes_a_name() {
    let cli = Cli::parse_from(["grid-snake-arena", "client", "--port", "9000", "--name", "ana"]);
    assert_eq!(cli.mode, Mode::Client);
    assert_eq!(cli.port, 9000);
    assert_eq!(cli.name, "ana");
  }
}
