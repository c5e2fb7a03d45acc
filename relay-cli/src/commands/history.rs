use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use engine::{NullNotifier, SyncEngine};
use shared::{
    config::Config,
    models::{Message, MessageDirection},
};
use uuid::Uuid;

#[derive(Args, Debug)]
#[command(about = "Page through a conversation's message history")]
pub struct HistoryArgs {
    /// Conversation identifier to display
    #[arg(long, alias = "conv")]
    pub conversation: Uuid,

    /// Number of pages to load (the first page plus `pages - 1` older ones)
    #[arg(long, default_value_t = 1)]
    pub pages: u32,
}

pub async fn handle(config: &Config, args: HistoryArgs) -> Result<()> {
    let engine = SyncEngine::with_parts(
        config,
        Arc::new(engine::HttpSyncApi::new(config)?),
        Arc::new(NullNotifier::new()),
    )?;

    engine
        .open_conversation(args.conversation)
        .await
        .context("failed to fetch the first history page")?;

    for _ in 1..args.pages {
        if !engine
            .load_older(args.conversation)
            .await
            .context("failed to fetch an older history page")?
        {
            break;
        }
    }

    let messages = engine.messages(args.conversation);
    if messages.is_empty() {
        println!("No messages in conversation {}.", args.conversation);
        return Ok(());
    }

    for message in &messages {
        render_message(message);
    }
    if engine.has_more(args.conversation) {
        println!("(older messages available; re-run with --pages {})", args.pages + 1);
    }
    Ok(())
}

fn render_message(message: &Message) {
    let direction = match message.direction {
        MessageDirection::Incoming => "<-",
        MessageDirection::Outgoing => "->",
    };
    println!(
        "[{}] {direction} {} ({})",
        message.created_at,
        message.body,
        message.delivery_state.as_str()
    );
}
