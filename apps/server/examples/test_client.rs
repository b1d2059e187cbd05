//! Drives the service with raw RPC calls, without the client-side session.
//!
//! 1. Start the service: cargo run -p skypoll-server -- serve
//! 2. Run: cargo run -p skypoll-server --example test_client -- "SFO to JFK"

use config::AppStrategy;
use rpc::{
    FlightSearchClient,
    search::{PageRequest, SearchFilters},
};
use std::time::Duration;
use tarpc::{client, context, tokio_serde::formats::Bincode};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let query = std::env::args().nth(1).unwrap_or_else(|| "SFO to JFK".to_string());
    let strategy = config::create_strategy()?;
    let runtime_dir = config::resolve_dir("RUNTIME_DIRECTORY", &strategy, |s| s.runtime_dir());
    let socket_path = config::socket_path(runtime_dir);
    println!("connecting to {socket_path:?}");

    let transport = tarpc::serde_transport::unix::connect(&socket_path, Bincode::default).await?;
    let client = FlightSearchClient::new(client::Config::default(), transport).spawn();

    println!("ping: {}", client.ping(context::current()).await?);

    let session_id = client.create_session(context::current(), query.clone()).await??;
    println!("session {session_id} started for {query:?}");

    let mut request = PageRequest {
        session_id,
        page: 1,
        limit: 10,
        filters: SearchFilters::default(),
    };
    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let page = client.fetch_page(context::current(), request.clone()).await??;
        println!(
            "progress {:>3.0}%  {} matching, {} on page 1",
            page.progress * 100.0,
            page.total,
            page.results.len()
        );
        if page.progress >= 1.0 {
            break;
        }
    }

    request.filters = SearchFilters::default().with_max_stops(0);
    let page = client.fetch_page(context::current(), request).await??;
    println!("nonstop only: {} offers", page.total);
    for offer in &page.results {
        println!(
            "  {} {} {}-{} ${}",
            offer.id, offer.airline, offer.origin, offer.destination, offer.price
        );
    }

    let closed = client.close_session(context::current(), session_id).await?;
    println!("closed: {closed}");
    Ok(())
}
