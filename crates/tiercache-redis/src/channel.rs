//! Redis pub/sub transport for invalidation commands.
//!
//! One logical topic carries every command. Publishes go through the
//! shared pool; the subscription runs on a dedicated client because pooled
//! connections cannot `SUBSCRIBE`. Delivery is at-least-once and ordered
//! per sender only.
//!
//! While the connection is down, publishes fail with `ChannelUnavailable`
//! and nothing is queued — the caller decides whether to swallow that.
//! The receiver reconnects by itself after a fixed backoff; peers that
//! cached a value published during the outage keep it until the next
//! write on that key (there is no retroactive reconciliation).

use std::sync::Arc;
use std::time::Duration;

use deadpool_redis::Pool;
use futures_util::StreamExt;
use redis::AsyncCommands;
use tiercache_core::{CacheError, Command, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delay before the receiver attempts to reconnect.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Handler invoked for every command received on the topic.
pub type CommandHandler = Arc<dyn Fn(Command) + Send + Sync>;

pub struct InvalidationChannel {
    pool: Pool,
    /// Separate URL because the subscriber needs its own client.
    url: String,
    topic: String,
}

impl InvalidationChannel {
    pub fn new(pool: Pool, url: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            pool,
            url: url.into(),
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish one command to every subscriber on the topic.
    pub async fn publish(&self, command: &Command) -> Result<()> {
        let payload = command.to_wire()?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::channel_unavailable(format!("pool: {e}")))?;
        conn.publish::<_, _, ()>(&self.topic, payload)
            .await
            .map_err(|e| CacheError::channel_unavailable(format!("PUBLISH: {e}")))?;
        debug!(topic = %self.topic, op = ?command.op, region = %command.region, "published command");
        Ok(())
    }

    /// Spawn the receiver worker.
    ///
    /// The worker subscribes, forwards each decoded command to `handler`,
    /// and reconnects after [`RECONNECT_DELAY`] whenever the connection
    /// drops. Abort the returned handle to close the subscription.
    pub fn subscribe(&self, handler: CommandHandler) -> JoinHandle<()> {
        let url = self.url.clone();
        let topic = self.topic.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = Self::receive_loop(&url, &topic, &handler).await {
                    warn!(topic = %topic, error = %e, "channel receiver error, reconnecting");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        })
    }

    async fn receive_loop(url: &str, topic: &str, handler: &CommandHandler) -> Result<()> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::channel_unavailable(format!("client: {e}")))?;
        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| CacheError::channel_unavailable(format!("connect: {e}")))?;
        pubsub
            .subscribe(topic)
            .await
            .map_err(|e| CacheError::channel_unavailable(format!("SUBSCRIBE: {e}")))?;

        info!(topic = %topic, "subscribed to invalidation channel");

        let mut stream = pubsub.on_message();
        loop {
            match stream.next().await {
                Some(msg) => {
                    let payload: Vec<u8> = match msg.get_payload() {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!(topic = %topic, error = %e, "unreadable channel payload");
                            continue;
                        }
                    };
                    match Command::from_wire(&payload) {
                        Ok(command) => handler.as_ref()(command),
                        Err(e) => {
                            warn!(topic = %topic, error = %e, "undecodable channel command");
                        }
                    }
                }
                None => {
                    return Err(CacheError::channel_unavailable("subscription stream ended"));
                }
            }
        }
    }
}
