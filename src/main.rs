use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use peerfleet::{
    init_logging,
    ui::{transport_hint, ConsoleView},
    GameSession, NetConfig, Orientation, PeerProtocol, Phase,
    SessionConfig, SessionSignal, TcpSink, TcpSource, Winner, DEFAULT_FLEET, DEFAULT_HEIGHT,
    DEFAULT_WIDTH,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{timeout, Duration};

#[derive(Parser)]
#[command(author, version, about = "Two-player battleship over a peer-to-peer link", long_about = None)]
struct Cli {
    /// Address our acceptor listens on.
    #[arg(long, default_value = "0.0.0.0:7000")]
    listen: String,
    /// Address of the peer's acceptor.
    #[arg(long)]
    peer: String,
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: u32,
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: u32,
    /// Ship lengths of the fleet, comma separated. Must match the peer's.
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_FLEET)]
    ships: Vec<u32>,
    /// Give up on an outbound message after this many milliseconds.
    #[arg(long)]
    send_timeout_ms: Option<u64>,
    #[arg(long, help = "Fix RNG seed for reproducible placement (e.g., --seed 12345)")]
    seed: Option<u64>,
    /// Place the fleet at random instead of asking.
    #[arg(long)]
    auto: bool,
}

const HELP: &str = "Commands:
  place <length> <x> <y> <h|v>   place a ship with its top-left cell at (x, y)
  auto                           place the remaining ships at random
  fire <x> <y>                   shoot at the enemy field
  show                           redraw the boards
  help                           this text
Close the input (Ctrl-D) to give up.";

fn parse_coord(arg: Option<&str>, name: &str) -> anyhow::Result<i32> {
    let raw = arg.with_context(|| format!("missing {}", name))?;
    raw.parse()
        .with_context(|| format!("invalid {} '{}'", name, raw))
}

fn run_command(session: &GameSession, line: &str, rng: &mut SmallRng) -> anyhow::Result<()> {
    let mut words = line.split_whitespace();
    match words.next() {
        None => Ok(()),
        Some("place") => {
            let length = parse_coord(words.next(), "length")?;
            let x = parse_coord(words.next(), "x")?;
            let y = parse_coord(words.next(), "y")?;
            let orientation = match words.next() {
                Some("h") | Some("H") => Orientation::Horizontal,
                Some("v") | Some("V") => Orientation::Vertical,
                other => anyhow::bail!("orientation must be h or v, got {:?}", other),
            };
            let length = u32::try_from(length).context("length must be positive")?;
            Ok(session.place_ship(length, x, y, orientation)?)
        }
        Some("auto") => Ok(session.place_fleet_randomly(rng)?),
        Some("fire") => {
            let x = parse_coord(words.next(), "x")?;
            let y = parse_coord(words.next(), "y")?;
            Ok(session.player_has_seen(x, y)?)
        }
        Some("show") => {
            let state = session.snapshot();
            println!(
                "{}{}",
                peerfleet::ui::render_board(&state),
                peerfleet::ui::describe_phase(&state)
            );
            Ok(())
        }
        Some("help") => {
            println!("{}", HELP);
            Ok(())
        }
        Some(other) => anyhow::bail!("unknown command '{}', try 'help'", other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = SessionConfig::new(cli.width, cli.height, &cli.ships)?;
    let mut net = NetConfig::new(cli.listen, cli.peer);
    net.send_timeout_ms = cli.send_timeout_ms;

    let mut rng = if let Some(s) = cli.seed {
        println!("Using fixed seed: {}", s);
        SmallRng::seed_from_u64(s)
    } else {
        let mut seed_rng = rand::rng();
        SmallRng::from_rng(&mut seed_rng)
    };

    let session = Arc::new(GameSession::new(config));
    session.add_observer(Arc::new(ConsoleView::stdout()));

    let source = TcpSource::from_config(&net).await?;
    println!(
        "Listening on {}, peer expected at {}",
        source.local_addr()?,
        net.peer
    );
    let sink = TcpSink::from_config(&net);
    let mut handle = PeerProtocol::start(Arc::clone(&session), sink, source);

    println!("{}", HELP);
    println!(
        "Ready is sent once, when your last ship is placed; make sure the peer at {} is already listening.",
        net.peer
    );
    session.initialize()?;
    if cli.auto {
        session.place_fleet_randomly(&mut rng)?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let winner = loop {
        tokio::select! {
            signal = handle.next_signal() => match signal {
                Some(SessionSignal::Ended(winner)) => {
                    // A desync ends the game first; report it too.
                    let follow_up = timeout(Duration::from_millis(100), handle.next_signal()).await;
                    if let Ok(Some(SessionSignal::Desynchronized(e))) = follow_up {
                        eprintln!("Lost sync with the peer: {}", e);
                    }
                    break Some(winner);
                }
                Some(SessionSignal::Desynchronized(e)) => {
                    eprintln!("Lost sync with the peer: {}", e);
                    break session.winner();
                }
                Some(SessionSignal::TransportFailure(msg)) => {
                    eprintln!("Network problem: {}", msg);
                    if let Some(hint) = session.inspect(transport_hint) {
                        eprintln!("{}", hint);
                    }
                }
                None => break session.winner(),
            },
            line = lines.next_line() => match line.context("read stdin")? {
                Some(line) => {
                    if let Err(e) = run_command(&session, line.trim(), &mut rng) {
                        println!("{:#}", e);
                    }
                }
                None => {
                    if session.phase() != Phase::Ended {
                        println!("Input closed, giving up.");
                        if let Err(e) = session.end_game(Winner::Enemy) {
                            log::warn!("could not end game: {}", e);
                        }
                    }
                    break session.winner();
                }
            },
        }
    };

    handle.shutdown().await;
    match winner {
        Some(Winner::Player) => println!("You won!"),
        Some(Winner::Enemy) => println!("The enemy won."),
        _ => println!("The game ended without a winner."),
    }
    Ok(())
}
