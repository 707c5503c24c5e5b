//! Background reconnect with two-tier backoff

use crate::config::ReconnectConfig;
use crate::error::Result;
use crate::logging::get_logger;
use crate::sunspec::{Connector, ModelId, RegisterTransport};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Wait schedule between reconnect attempts
///
/// The first `short_attempts` attempts wait `short_delay`; every attempt
/// after that waits `long_delay`. The delay never grows beyond the long tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub short_delay: Duration,
    pub long_delay: Duration,
    pub short_attempts: u32,
}

impl ReconnectPolicy {
    /// Wait before the 1-based `attempt`
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if attempt <= self.short_attempts {
            self.short_delay
        } else {
            self.long_delay
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            short_delay: Duration::from_secs(config.short_delay_seconds),
            long_delay: Duration::from_secs(config.long_delay_seconds),
            short_attempts: config.short_attempts,
        }
    }
}

/// How a reconnect task ended
pub enum ReconnectOutcome {
    /// Fresh link with at least one block
    Connected {
        transport: Box<dyn RegisterTransport>,
        blocks: BTreeSet<ModelId>,
        attempts: u32,
    },
    /// The device answered but exposes nothing usable
    NoBlocks { attempts: u32 },
}

impl fmt::Debug for ReconnectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconnectOutcome::Connected {
                blocks, attempts, ..
            } => f
                .debug_struct("Connected")
                .field("blocks", blocks)
                .field("attempts", attempts)
                .finish_non_exhaustive(),
            ReconnectOutcome::NoBlocks { attempts } => f
                .debug_struct("NoBlocks")
                .field("attempts", attempts)
                .finish(),
        }
    }
}

async fn connect_and_discover(
    connector: &dyn Connector,
) -> Result<(Box<dyn RegisterTransport>, BTreeSet<ModelId>)> {
    let mut transport = connector.connect().await?;
    match transport.discover_blocks().await {
        Ok(blocks) => Ok((transport, blocks)),
        Err(e) => {
            transport.close();
            Err(e)
        }
    }
}

/// Retry until a link with discoverable blocks is up or the device turns
/// out to expose none
pub async fn run(connector: Arc<dyn Connector>, policy: ReconnectPolicy) -> ReconnectOutcome {
    let logger = get_logger("reconnect");
    let target = connector.describe();
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);
        let delay = policy.delay_before_attempt(attempt);
        logger.info(&format!(
            "Reconnect attempt {} to {} in {}s",
            attempt,
            target,
            delay.as_secs()
        ));
        tokio::time::sleep(delay).await;

        match connect_and_discover(connector.as_ref()).await {
            Ok((mut transport, blocks)) if blocks.is_empty() => {
                transport.close();
                logger.error(&format!(
                    "Reconnected to {} but no SunSpec blocks were found; giving up",
                    target
                ));
                return ReconnectOutcome::NoBlocks { attempts: attempt };
            }
            Ok((transport, blocks)) => {
                logger.info(&format!(
                    "Reconnected to {} after {} attempt(s)",
                    target, attempt
                ));
                return ReconnectOutcome::Connected {
                    transport,
                    blocks,
                    attempts: attempt,
                };
            }
            Err(e) => {
                logger.warn(&format!("Reconnect attempt {} failed: {}", attempt, e));
            }
        }
    }
}
