//! The long-poll loop.
//!
//! Each update is handled on its own task so a slow search for one user
//! never delays another user's events.

use crate::telegram::{Delivery, TelegramClient, delivery_from_update, outbound_requests};
use barbot_conversation::{Dispatcher, InboundEvent, Response};
use barbot_integration::SearchClient;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Pause after a failed poll before trying again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Connects the dispatcher to Telegram.
pub struct Bot<C> {
    telegram: TelegramClient,
    dispatcher: Arc<Dispatcher<C>>,
}

impl<C> Bot<C>
where
    C: SearchClient + 'static,
{
    #[must_use]
    pub fn new(telegram: TelegramClient, dispatcher: Arc<Dispatcher<C>>) -> Self {
        Self {
            telegram,
            dispatcher,
        }
    }

    /// Polls for updates until `shutdown` resolves, then waits for the
    /// events already being handled.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();
        let mut offset: i64 = 0;
        tokio::pin!(shutdown);

        loop {
            let updates = tokio::select! {
                () = &mut shutdown => break,
                updates = self.telegram.get_updates(offset) => updates,
            };

            match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let Some(delivery) = delivery_from_update(update) else {
                            continue;
                        };
                        tasks.push(tokio::spawn(deliver(
                            self.telegram.clone(),
                            Arc::clone(&self.dispatcher),
                            delivery,
                        )));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "polling for updates failed");
                    tokio::select! {
                        () = &mut shutdown => break,
                        () = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                    }
                }
            }

            tasks.retain(|task| !task.is_finished());
        }

        info!(in_flight = tasks.len(), "stopped polling, draining events");
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "event task failed");
            }
        }
    }
}

/// Handles one update and sends the response.
async fn deliver<C: SearchClient>(
    telegram: TelegramClient,
    dispatcher: Arc<Dispatcher<C>>,
    delivery: Delivery,
) {
    let Delivery {
        chat_id,
        callback_query_id,
        event,
    } = delivery;

    let acknowledge = async {
        if let Some(id) = &callback_query_id
            && let Err(e) = telegram.answer_callback_query(id).await
        {
            warn!(error = %e, "failed to answer callback query");
        }
    };
    if event.is_none() {
        debug!(chat_id, "ignoring update without event");
    }
    let Some(response) = dispatch(&dispatcher, event, acknowledge).await else {
        return;
    };

    for request in outbound_requests(chat_id, &response) {
        if let Err(e) = telegram.send(&request).await {
            warn!(error = %e, chat_id, "failed to deliver response");
            break;
        }
    }
}

/// Hands `event` to the dispatcher while `acknowledge` runs alongside it.
///
/// Nothing is awaited before the dispatcher queues on the user's session,
/// so one user's events reach it in the order their tasks were spawned.
async fn dispatch<C: SearchClient>(
    dispatcher: &Dispatcher<C>,
    event: Option<InboundEvent>,
    acknowledge: impl Future<Output = ()>,
) -> Option<Response> {
    let handle = async {
        match event {
            Some(event) => dispatcher.handle(event).await,
            None => None,
        }
    };
    let (response, ()) = tokio::join!(handle, acknowledge);
    response
}
