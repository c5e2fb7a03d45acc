use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::Args;
use engine::{DesktopNotifier, NullNotifier, Notifier, SyncEngine};
use shared::config::Config;

#[derive(Args, Debug)]
#[command(about = "Follow the live push channel")]
pub struct FollowArgs {
    /// Suppress desktop notifications while following
    #[arg(long)]
    pub quiet: bool,
}

pub async fn handle(config: &Config, args: FollowArgs) -> Result<()> {
    let notifier: Arc<dyn Notifier> = if args.quiet {
        Arc::new(NullNotifier::new())
    } else {
        Arc::new(DesktopNotifier::new())
    };
    let engine = SyncEngine::with_parts(
        config,
        Arc::new(engine::HttpSyncApi::new(config)?),
        notifier,
    )?;

    engine.start().await;
    println!(
        "Following {} (press Ctrl+C to stop)",
        config.server_url
    );

    let mut states = engine.watch_connection();
    let mut last_total = engine.unread_store().total_unread();
    println!("connection: {}", engine.connection_state());

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            changed = states.changed() => {
                if changed.is_ok() {
                    println!("connection: {}", *states.borrow_and_update());
                }
            }
            _ = ticker.tick() => {
                let total = engine.unread_store().total_unread();
                if total != last_total {
                    println!("unread total: {total}");
                    last_total = total;
                }
            }
        }
    }

    engine.disconnect();
    println!("disconnected.");
    Ok(())
}
