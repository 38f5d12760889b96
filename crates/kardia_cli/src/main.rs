use clap::Parser;
use kardia_core::{KardiaConfig, Posture, PostureTracker};
use kardia_store::{LimbicStore, SqliteStateStore};
use kardia_sync::SyncClient;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long, default_value = "kardia.toml")]
    config: String,

    /// Override the SQLite snapshot path
    #[arg(long)]
    db: Option<String>,

    /// Override the backend base URL
    #[arg(long, env = "KARDIA_BASE_URL")]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut config = KardiaConfig::load_or_default(&args.config);
    if let Some(db) = args.db {
        config.store.db_path = db;
    }
    if let Some(url) = args.base_url {
        config.backend.base_url = url;
    }

    // 1. Open the durable snapshot and the local store
    info!("Opening state store at {}...", config.store.db_path);
    let adapter = Arc::new(SqliteStateStore::new(&config.store.db_path).await?);
    let store = Arc::new(LimbicStore::open(adapter, None).await);

    // 2. Start the sync client against the backend
    info!("Starting sync against {}...", config.backend.base_url);
    let sync = SyncClient::start(&config, store.clone())?;

    // 3. Log posture transitions as the state evolves
    {
        let mut rx = store.subscribe();
        let posture_cfg = config.posture.clone();
        let initial = store.state().await;
        tokio::spawn(async move {
            let mut tracker = PostureTracker::new(
                &initial,
                posture_cfg.thresholds(),
                posture_cfg.smoothing,
            );
            let mut last = tracker.current();
            while rx.changed().await.is_ok() {
                let snapshot = *rx.borrow();
                let posture = tracker.observe(&snapshot);
                if posture != last {
                    info!("Posture transition: {} -> {}", last, posture);
                    last = posture;
                }
            }
        });
    }

    // 4. Tear the channel down on Ctrl-C
    {
        let sync = sync.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                sync.shutdown();
                std::process::exit(0);
            }
        });
    }

    println!("Kardia online. Commands: state | history | touch <kind> | posture <P> | answer <text> | reset | quit");
    print!("> ");
    io::stdout().flush()?;

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let trimmed = input.trim();

        match trimmed {
            "" => {}
            "quit" | "exit" => break,
            "state" => {
                let s = store.state().await;
                println!("{}", serde_json::to_string_pretty(&s)?);
                println!("connection: {}", sync.connection_state());
            }
            "history" => {
                let history = store.history().await;
                println!("{} superseded snapshot(s)", history.len());
                for entry in history.iter().rev().take(5) {
                    println!(
                        "  @{} trust={:.2} warmth={:.2} arousal={:.2} valence={:.2} posture={}",
                        entry.recorded_at,
                        entry.state.trust,
                        entry.state.warmth,
                        entry.state.arousal,
                        entry.state.valence,
                        entry.state.posture,
                    );
                }
            }
            "reset" => {
                store.reset().await;
                println!("state reset to defaults");
            }
            _ => {
                if let Some(kind) = trimmed.strip_prefix("touch ") {
                    sync.send_interaction(kind.trim()).await;
                    println!("interaction '{}' queued ({})", kind.trim(), sync.connection_state());
                } else if let Some(label) = trimmed.strip_prefix("posture ") {
                    match label.trim().parse::<Posture>() {
                        Ok(p) => {
                            store.set_posture(p).await;
                            println!("posture overridden to {}", p);
                        }
                        Err(e) => println!("[error] {}", e),
                    }
                } else if let Some(text) = trimmed.strip_prefix("answer ") {
                    match sync.convergence().submit_answer(text.trim()).await {
                        Ok(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
                        Err(e) => println!("[{}] {}", e.kind(), e),
                    }
                } else {
                    println!("unknown command: {}", trimmed);
                }
            }
        }

        print!("> ");
        io::stdout().flush()?;
    }

    sync.shutdown();
    Ok(())
}
