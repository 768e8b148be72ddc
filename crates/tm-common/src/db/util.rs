#![allow(async_fn_in_trait)]

use deadpool_postgres::GenericClient;
use std::sync::OnceLock;
use std::time::Instant;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Error, Row};
use tracing::warn;

type SqlParams<'a> = &'a [&'a (dyn ToSql + Sync)];

/// Millisecond threshold above which a query is reported, read once from
/// `TM_DB_LOG_MIN_DURATION_MS`. Unset, unparsable, or zero disables reporting.
fn slow_query_threshold_ms() -> Option<u64> {
    static THRESHOLD: OnceLock<Option<u64>> = OnceLock::new();

    *THRESHOLD.get_or_init(|| {
        let raw = std::env::var("TM_DB_LOG_MIN_DURATION_MS").ok()?;
        raw.parse::<u64>().ok().filter(|ms| *ms > 0)
    })
}

fn note_if_slow(label: &str, started: Instant) {
    let Some(threshold) = slow_query_threshold_ms() else {
        return;
    };
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if elapsed_ms >= threshold {
        warn!(query = label, elapsed_ms, "slow_query_detected");
    }
}

/// Prepared-statement helpers that time each call and report the ones slower
/// than the configured threshold under a stable label.
pub trait TimedClientExt: GenericClient {
    async fn timed_query_cached(
        &self,
        statement: &str,
        params: SqlParams<'_>,
        label: &str,
    ) -> Result<Vec<Row>, Error> {
        let started = Instant::now();
        let prepared = self.prepare_cached(statement).await?;
        let rows = self.query(&prepared, params).await;
        note_if_slow(label, started);
        rows
    }

    async fn timed_query_opt_cached(
        &self,
        statement: &str,
        params: SqlParams<'_>,
        label: &str,
    ) -> Result<Option<Row>, Error> {
        let started = Instant::now();
        let prepared = self.prepare_cached(statement).await?;
        let row = self.query_opt(&prepared, params).await;
        note_if_slow(label, started);
        row
    }

    async fn timed_execute_cached(
        &self,
        statement: &str,
        params: SqlParams<'_>,
        label: &str,
    ) -> Result<u64, Error> {
        let started = Instant::now();
        let prepared = self.prepare_cached(statement).await?;
        let affected = self.execute(&prepared, params).await;
        note_if_slow(label, started);
        affected
    }
}

impl<T: GenericClient + ?Sized> TimedClientExt for T {}
