use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use engine::{NullNotifier, SyncEngine};
use shared::config::Config;

#[derive(Args, Debug)]
#[command(about = "Show per-conversation unread counts")]
pub struct UnreadArgs {
    /// Only list conversations with at least one unread message
    #[arg(long)]
    pub only_unread: bool,
}

pub async fn handle(config: &Config, args: UnreadArgs) -> Result<()> {
    let engine = SyncEngine::with_parts(
        config,
        Arc::new(engine::HttpSyncApi::new(config)?),
        Arc::new(NullNotifier::new()),
    )?;
    engine
        .refresh_unread()
        .await
        .context("failed to fetch unread snapshot")?;

    let counts = engine.unread_store().all_counts();
    let mut shown = 0_usize;
    for (conversation_id, count) in counts {
        if args.only_unread && count == 0 {
            continue;
        }
        println!("{conversation_id}  unread={count}");
        shown += 1;
    }

    if shown == 0 {
        println!("No conversations to show.");
    } else {
        println!("total unread: {}", engine.unread_store().total_unread());
    }
    Ok(())
}
