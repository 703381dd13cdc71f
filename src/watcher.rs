//! Main ingestion loop
//!
//! Orchestrates polling for new blocks, filtering transactions sent to
//! the pool address, enrichment, and idempotent persistence. The
//! cursor (highest fully processed block) advances strictly in
//! ascending order and only past blocks whose matched transactions
//! were all attempted; together with `Ledger::insert_if_absent` this
//! yields effectively-once persistence per transaction hash.

use crate::config::IngestConfig;
use crate::enrich::enrich;
use crate::error::IngestError;
use crate::oracle::PriceOracle;
use crate::records::DeadLetter;
use crate::rpc::ChainReader;
use crate::store::Ledger;
use crate::types::{Block, Transaction};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Counters exposed for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Blocks fully attempted (cursor advanced past them)
    pub blocks_processed: u64,
    /// Transactions matching the pool address
    pub txs_matched: u64,
    /// New records written to the ledger
    pub records_inserted: u64,
    /// Transactions dead-lettered after exhausted retries
    pub tx_failures: u64,
    /// Cycles aborted by an unavailable dependency
    pub cycle_failures: u64,
}

/// The ingestion orchestrator.
///
/// All collaborators are injected so tests can substitute fakes for
/// the node, the price feed, and storage.
pub struct Watcher<C, P, L> {
    chain: C,
    oracle: P,
    ledger: L,
    config: IngestConfig,
    cursor: Option<u64>,
    stats: IngestStats,
    shutdown: watch::Receiver<bool>,
}

impl<C, P, L> Watcher<C, P, L>
where
    C: ChainReader,
    P: PriceOracle,
    L: Ledger,
{
    /// Create a watcher; call `initialize` before `run`.
    pub fn new(
        chain: C,
        oracle: P,
        ledger: L,
        config: IngestConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            chain,
            oracle,
            ledger,
            config,
            cursor: None,
            stats: IngestStats::default(),
            shutdown,
        }
    }

    /// Highest fully processed block, once initialized.
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    /// Current counters.
    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Recover or derive the starting cursor.
    ///
    /// Priority: persisted cursor, then the ledger's highest recorded
    /// block, then the configured start block, then the node's latest
    /// (point-in-time start: only track changes going forward).
    pub async fn initialize(&mut self) -> Result<(), IngestError> {
        let cursor = match self.ledger.get_cursor()? {
            Some(c) => {
                info!("Resuming from persisted cursor at block {}", c);
                c
            }
            None => match self.ledger.max_block_number()? {
                Some(max) => {
                    info!("Recovered cursor from ledger records at block {}", max);
                    max
                }
                None => match self.config.start_block {
                    Some(start) => {
                        info!("Empty ledger, starting from configured block {}", start);
                        start
                    }
                    None => {
                        let latest = self.chain.latest_height().await?;
                        info!("Empty ledger, starting from current latest block {}", latest);
                        latest
                    }
                },
            },
        };

        self.ledger.set_cursor(cursor)?;
        self.cursor = Some(cursor);
        Ok(())
    }

    /// Run until shutdown is signalled.
    ///
    /// Unavailable dependencies never terminate the loop; each failed
    /// cycle backs off and retries from the un-advanced cursor.
    pub async fn run(&mut self) -> Result<(), IngestError> {
        if self.cursor.is_none() {
            self.initialize().await?;
        }
        info!(
            "Watching pool {} from block {}",
            self.config.pool_address,
            self.cursor.unwrap_or(0)
        );

        loop {
            if *self.shutdown.borrow() {
                info!("Shutdown requested, stopping cleanly at cursor {:?}", self.cursor);
                return Ok(());
            }

            match self.run_cycle().await {
                Ok(()) => self.sleep_or_shutdown(self.config.poll_interval).await,
                Err(e) => {
                    self.stats.cycle_failures += 1;
                    warn!("Ingestion cycle failed ({}), backing off", e);
                    self.sleep_or_shutdown(self.config.error_backoff).await;
                }
            }
        }
    }

    /// One polling cycle: catch the cursor up to the node's latest.
    ///
    /// Errors here are always retryable; the cursor never moves past a
    /// block that was not fully attempted.
    pub async fn run_cycle(&mut self) -> Result<(), IngestError> {
        let cursor = self.cursor.ok_or_else(|| {
            IngestError::InvalidInput("watcher not initialized".into())
        })?;
        let latest = self.chain.latest_height().await?;

        if latest <= cursor {
            debug!("Up to date (cursor {}, latest {})", cursor, latest);
            return Ok(());
        }

        info!("New blocks available: cursor={}, latest={}", cursor, latest);

        for height in (cursor + 1)..=latest {
            if *self.shutdown.borrow() {
                return Ok(());
            }

            let complete = self.process_block(height).await?;
            if !complete {
                // Shutdown landed mid-block; leave it for the next run.
                return Ok(());
            }

            self.ledger.set_cursor(height)?;
            self.cursor = Some(height);
            self.stats.blocks_processed += 1;
        }

        Ok(())
    }

    /// Attempt every matched transaction in one block.
    ///
    /// Returns Ok(false) when shutdown interrupted the block before
    /// every matched transaction was attempted.
    async fn process_block(&mut self, height: u64) -> Result<bool, IngestError> {
        let block = self.chain.get_block(height).await?;
        let pool = self.config.pool_address;

        debug!(
            "Processing block {} ({} transactions)",
            height,
            block.transactions.len()
        );

        for tx in &block.transactions {
            if !tx.is_to(pool) {
                continue;
            }
            if *self.shutdown.borrow() {
                return Ok(false);
            }

            self.stats.txs_matched += 1;
            self.attempt_transaction(tx, &block).await?;
        }

        Ok(true)
    }

    /// Enrich and persist one matched transaction.
    ///
    /// An unavailable node or ledger propagates (the whole block will
    /// be retried); quote and input failures are isolated to this
    /// transaction and dead-lettered after bounded retries so they
    /// never stall the cursor.
    async fn attempt_transaction(
        &mut self,
        tx: &Transaction,
        block: &Block,
    ) -> Result<(), IngestError> {
        let receipt = match self.chain.get_receipt(tx.hash).await {
            Ok(receipt) => receipt,
            Err(e @ IngestError::NotFound(_)) => {
                // A missing receipt for a mined transaction will not
                // appear on retry; record and move on.
                self.fail_transaction(tx, block, 1, &e)?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let max_attempts = self.config.quote_attempts.max(1);
        let mut last_err: Option<IngestError> = None;
        for attempt in 1..=max_attempts {
            match self.oracle.current_price(&self.config.pair).await {
                Ok(quote) => match enrich(tx, &receipt, block, &quote) {
                    Ok(record) => {
                        if self.ledger.insert_if_absent(&record)? {
                            self.stats.records_inserted += 1;
                            info!(
                                "Recorded tx {:?} in block {}: fee {} native / {} fiat",
                                record.hash, record.block_number, record.fee_native, record.fee_fiat
                            );
                        } else {
                            debug!("Tx {:?} already recorded, skipping", tx.hash);
                        }
                        return Ok(());
                    }
                    Err(e) => {
                        // Bad input data; retrying cannot fix it.
                        self.fail_transaction(tx, block, attempt, &e)?;
                        return Ok(());
                    }
                },
                Err(e) => {
                    warn!(
                        "Quote attempt {}/{} failed for tx {:?}: {}",
                        attempt, max_attempts, tx.hash, e
                    );
                    last_err = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.quote_retry_delay).await;
                    }
                }
            }
        }

        let err = last_err
            .unwrap_or_else(|| IngestError::QuoteUnavailable("no attempt made".into()));
        self.fail_transaction(tx, block, max_attempts, &err)?;
        Ok(())
    }

    /// Dead-letter a transaction that cannot be enriched.
    fn fail_transaction(
        &mut self,
        tx: &Transaction,
        block: &Block,
        attempts: u32,
        err: &IngestError,
    ) -> Result<(), IngestError> {
        self.stats.tx_failures += 1;
        warn!(
            "Giving up on tx {:?} in block {} after {} attempt(s): {}",
            tx.hash, block.number, attempts, err
        );
        self.ledger.put_dead_letter(&DeadLetter {
            hash: tx.hash,
            block_number: block.number,
            attempts,
            reason: err.to_string(),
        })
    }

    /// Sleep, waking early if shutdown is signalled.
    async fn sleep_or_shutdown(&mut self, duration: Duration) {
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = shutdown.changed() => {}
        }
    }
}
