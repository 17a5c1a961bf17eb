use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use stn_core::bot::{Controller, COMMAND_MENU};

use crate::handlers;

/// Publish the command menu shown by Telegram clients.
pub async fn register_commands(bot: &Bot) {
    let commands: Vec<BotCommand> = COMMAND_MENU
        .iter()
        .map(|(name, description)| BotCommand::new(*name, *description))
        .collect();
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!(error = %e, "failed to register bot commands");
    }
}

/// Long-poll for updates until `shutdown` is cancelled.
///
/// Updates are handled one at a time, in arrival order.
pub async fn run_polling(bot: Bot, controller: Arc<Controller>, shutdown: CancellationToken) {
    register_commands(&bot).await;

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![controller])
        .distribution_function(|_| Some(()))
        .build();

    let stop = dispatcher.shutdown_token();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        match stop.shutdown() {
            Ok(done) => done.await,
            Err(e) => warn!(error = %e, "dispatcher was not running at shutdown"),
        }
    });

    info!("telegram polling started");
    dispatcher.dispatch().await;
    info!("telegram polling stopped");
}
