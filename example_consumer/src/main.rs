//! Example consumer: refreshes one team into an in-memory state target.
//!
//! Run from repo root: `ONCALL_ACCESS_TOKEN=... cargo run -p example-consumer -- <team-id>`

use oncall_sdk::{apply_read, ApiClient, CancelToken, ClientConfig, MemoryState, StateTarget};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("oncall_sdk=info")),
        )
        .init();

    let team_id = std::env::args().nth(1).ok_or("usage: example-consumer <team-id>")?;
    let config = ClientConfig::from_env()?;
    let client = ApiClient::new(config)?;
    let cancel = CancelToken::with_timeout(Duration::from_secs(30));

    let mut state = MemoryState::new();
    state.set_id(team_id.clone());
    let team = client.get_team(&team_id, &cancel).await;
    apply_read(team, &mut state)?;

    match state.id() {
        Some(id) => {
            tracing::info!("team {} refreshed", id);
            for (key, value) in state.attributes() {
                println!("{key} = {value}");
            }
        }
        None => tracing::info!("team {} no longer exists", team_id),
    }
    Ok(())
}
