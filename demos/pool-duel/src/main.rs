//! Two players, one pool, one round of dice.
//!
//! Run offline with `ARCADE_MOCK=1 cargo run -p pool-duel`, or point
//! `UAHV_ADDR` at a hypervisor and pass two slip tokens:
//! `cargo run -p pool-duel -- <token-a> <token-b>`.

use std::time::Duration;

use arcade_sdk::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// The table's dice, seeded from the server's `random_seed` so replays
/// with the same seed give the same match.
fn table_dice(seed: &str) -> StdRng {
    let mut key = [0u8; 32];
    for (i, byte) in seed.bytes().enumerate() {
        key[i % key.len()] ^= byte;
    }
    StdRng::from_seed(key)
}

/// Three dice.
fn roll(dice: &mut impl Rng) -> i64 {
    (0..3).map(|_| dice.random_range(1..=6i64)).sum()
}

// ---------------------------------------------------------------------------
// Match flow
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), ArcadeError> {
    let config = SdkConfig::from_env();
    init_tracing(config.debug);

    let mut args = std::env::args().skip(1);
    let a = SlipToken::new(args.next().unwrap_or_else(|| "player-a".into()));
    let b = SlipToken::new(args.next().unwrap_or_else(|| "player-b".into()));

    let (failures, mut failed) = tokio::sync::mpsc::unbounded_channel();
    let sdk = ArcadeSdk::builder()
        .config(config)
        .heartbeat_failures(failures)
        .build()?;
    tokio::spawn(async move {
        while let Some(failure) = failed.recv().await {
            tracing::warn!(subject = %failure.subject, error = %failure.error, "heartbeat lost");
        }
    });

    let status = sdk.get_server_status().await?;
    info!(seed = %status.random_seed, "server assigned");

    let pool = PoolId::named("pool-duel");
    sdk.start_pool_heartbeat(&pool).await;

    for player in [&a, &b] {
        let profile = sdk.activate_slip(player).await?;
        info!(player = %profile.display_name, "joined");
    }
    sdk.lock_pool(&pool).await?;

    // Give the table a moment, as a real match would.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let mut dice = table_dice(&status.random_seed);
    let score_a = roll(&mut dice);
    let score_b = roll(&mut dice);
    sdk.report_player_score(&a, score_a).await?;
    sdk.report_player_score(&b, score_b).await?;
    info!(score_a, score_b, "dice rolled");

    match score_a.cmp(&score_b) {
        std::cmp::Ordering::Equal => {
            for player in [&a, &b] {
                sdk.settle_slip(player).await?;
            }
            sdk.return_pool(&pool, "players tied").await?;
            info!("tie, pool returned");
        }
        ordering => {
            let (winner, loser) = if ordering.is_gt() { (&a, &b) } else { (&b, &a) };
            sdk.player_defeated(loser, winner).await?;
            sdk.settle_slip(winner).await?;
            sdk.settle_pool(&pool, winner).await?;
            info!(%winner, "pool settled");
        }
    }

    sdk.shutdown().await?;
    Ok(())
}
