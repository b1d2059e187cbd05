mod cli;
mod command;
mod config;
mod error;
mod render;

use clap::Parser;
use command::UserCommand;
use error::{Result, WrapErr};
use render::Renderer;
use search_session::{RpcTransport, SearchSession, SessionError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // stdout belongs to the result listing
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let command_line = cli::Cli::parse();
    init_tracing(command_line.verbose);

    let mut cfg = config::Config::load().context("Load configuration error")?;
    cfg.apply_cli(&command_line);
    debug!(config_path = ?cfg.config_path, session = ?cfg.session, "configuration loaded");

    let transport = RpcTransport::connect(&cfg.socket_path)
        .await
        .wrap_err_with(|| format!("Could not connect to {:?}", cfg.socket_path))?;
    let pong = transport.ping().await?;
    debug!(%pong, "search service is up");

    let session = SearchSession::spawn(transport.clone(), cfg.session_config());
    if let Some(query) = &command_line.query {
        dispatch(&session, UserCommand::Search(query.clone()))?;
    } else {
        println!("{}", command::HELP);
    }

    run_repl(&session).await?;

    if let Some(session_id) = session.snapshot().session_id {
        if let Err(e) = transport.close_session(session_id).await {
            warn!(%session_id, "could not close the search session: {e}");
        }
    }
    session.close().await;
    Ok(())
}

async fn run_repl(session: &SearchSession) -> Result<()> {
    let mut renderer = Renderer::default();
    let mut updates = session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match command::parse(&line) {
                    Ok(Some(UserCommand::Quit)) => break,
                    Ok(Some(UserCommand::Help)) => println!("{}", command::HELP),
                    Ok(Some(user_command)) => dispatch(session, user_command)?,
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                for line in renderer.render(&snapshot) {
                    println!("{line}");
                }
            }
        }
    }
    Ok(())
}

fn dispatch(session: &SearchSession, user_command: UserCommand) -> Result<()> {
    let sent = match user_command {
        UserCommand::Search(query) => session.initialize(&query),
        UserCommand::Filter(filters) => session.update_filters(filters),
        UserCommand::More => session.load_more(),
        UserCommand::Cancel => session.cancel(),
        UserCommand::Help | UserCommand::Quit => Ok(()),
    };
    match sent {
        Err(SessionError::EmptyQuery) => {
            println!("{}", SessionError::EmptyQuery);
            Ok(())
        }
        other => Ok(other?),
    }
}
