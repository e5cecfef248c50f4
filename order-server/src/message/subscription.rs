//! Durable subscription
//!
//! Hands out journaled messages one at a time, in sequence order. The read
//! position advances as messages are handed out; the durable cursor only
//! advances on [`Subscription::ack`]. After a restart delivery resumes from the
//! cursor, so anything handed out but never acknowledged is delivered again.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::journal::{Delivery, JournalError, JournalResult, MessageJournal};

/// Messages fetched from the journal per read transaction
const FETCH_BATCH: usize = 64;

pub struct Subscription {
    journal: MessageJournal,
    channel: String,
    durable_name: String,
    /// Last sequence handed out
    position: u64,
    pending: VecDeque<Delivery>,
    notify: Arc<Notify>,
    shutdown_token: CancellationToken,
}

impl Subscription {
    pub(crate) fn new(
        journal: MessageJournal,
        channel: String,
        durable_name: String,
        position: u64,
        notify: Arc<Notify>,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            journal,
            channel,
            durable_name,
            position,
            pending: VecDeque::new(),
            notify,
            shutdown_token,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn durable_name(&self) -> &str {
        &self.durable_name
    }

    /// Wait for the next message
    ///
    /// Returns `Ok(None)` once the bus is shut down.
    pub async fn next(&mut self) -> JournalResult<Option<Delivery>> {
        loop {
            if self.shutdown_token.is_cancelled() {
                return Ok(None);
            }

            if let Some(delivery) = self.pending.pop_front() {
                self.position = delivery.sequence;
                return Ok(Some(delivery));
            }

            // Register for wakeups before reading so a publish between the
            // read and the wait is not missed
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let batch = self
                .journal
                .read_after(&self.channel, self.position, FETCH_BATCH)?;
            if !batch.is_empty() {
                self.pending.extend(batch);
                continue;
            }

            tokio::select! {
                _ = self.shutdown_token.cancelled() => return Ok(None),
                _ = &mut notified => {}
            }
        }
    }

    /// Acknowledge a delivery, advancing the durable cursor
    ///
    /// The cursor commit is durable, so it runs on the blocking pool.
    pub async fn ack(&self, delivery: &Delivery) -> JournalResult<()> {
        let journal = self.journal.clone();
        let channel = self.channel.clone();
        let durable_name = self.durable_name.clone();
        let sequence = delivery.sequence;

        tokio::task::spawn_blocking(move || journal.commit(&channel, &durable_name, sequence))
            .await
            .unwrap_or_else(|e| Err(JournalError::Task(e.to_string())))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("durable_name", &self.durable_name)
            .field("position", &self.position)
            .finish()
    }
}
