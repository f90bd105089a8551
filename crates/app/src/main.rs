//! Ballot - console client for planning-poker rooms

use std::process::ExitCode;

use ballot_core::{Database, IdentityStore};
use ballot_net::{
    event_channel, ConnectionManager, RoomAddress, SyncedState, TokioScheduler, WsTransport,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod console;
mod error;
mod session;

use config::{config_path, AppConfig, CONFIG_ENV};
use console::parse_intent;
use error::Result;
use session::{Reply, Session};

const DB_FILE: &str = "ballot.db";

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting Ballot");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Ballot stopped");
            eprintln!("ballot: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let path = config_path(std::env::args_os().nth(1), std::env::var_os(CONFIG_ENV))?;
    let config = AppConfig::load(&path)?;

    let data_dir = config.data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let db = Database::open(data_dir.join(DB_FILE))?;

    let mut identity = db.ensure()?;
    if config.apply_to(&mut identity) {
        db.save(&identity)?;
    }
    info!(user_uuid = %identity.user_uuid, name = %identity.user_name, role = %identity.role, "Loaded identity");

    let (address, generated) = RoomAddress::from_page_url(&config.page_url)?;
    if generated {
        info!(room = address.room_uuid(), "Created new room");
    }
    println!("Room: {}", address);

    let (events_tx, mut events) = event_channel();
    let connection = ConnectionManager::new(
        WsTransport::new(events_tx.clone()),
        TokioScheduler::new(events_tx),
    )
    .with_keepalive(config.keepalive());
    let mut synced = SyncedState::new(connection);
    synced.connect(&address, &identity);

    let mut session = Session::new(synced, identity, db);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if session.handle_event(event) {
                    print!("{}", session.render());
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let reply = match parse_intent(&line) {
                    Ok(Some(intent)) => session.execute(intent),
                    Ok(None) => continue,
                    Err(e) => Err(e),
                };
                match reply {
                    Ok(Reply::Quit) => break,
                    Ok(Reply::Render) => print!("{}", session.render()),
                    Ok(Reply::Message(message)) => println!("{}", message),
                    Ok(Reply::Silent) => {}
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    info!("Leaving room");
    Ok(())
}
