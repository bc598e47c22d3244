use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::OnceCell;
use sqlx::MySqlPool;

use crate::api::error::ServiceResult;
use crate::payroll::{
    AttendanceRecord, MonthlySummary, PayrollCycle, aggregate, aggregate_all, resolve_cycle,
};
use crate::repo::attendance as attendance_repo;

pub type SummaryKey = (String, PayrollCycle);

const DEFAULT_CAPACITY: u64 = 100_000;
const DEFAULT_TTL_SECS: u64 = 86_400;

/// Keys hash onto this many invalidation counters.
const STRIPES: usize = 64;

static SUMMARY_CACHE: OnceCell<Cache<SummaryKey, Arc<MonthlySummary>>> = OnceCell::new();
static INVALIDATIONS: [AtomicU64; STRIPES] = [const { AtomicU64::new(0) }; STRIPES];

/// Invalidation counters observed before attendance rows are read. A summary
/// built from those rows may only stay cached if its key's counter has not
/// moved since.
#[derive(Debug, Clone, Copy)]
pub struct Generations([u64; STRIPES]);

pub fn generations() -> Generations {
    Generations(std::array::from_fn(|i| INVALIDATIONS[i].load(Ordering::SeqCst)))
}

fn stripe(key: &SummaryKey) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % STRIPES as u64) as usize
}

fn build(capacity: u64, ttl_secs: u64) -> Cache<SummaryKey, Arc<MonthlySummary>> {
    Cache::builder()
        .max_capacity(capacity)
        .time_to_live(Duration::from_secs(ttl_secs))
        .build()
}

/// Sizes the cache from config. Only the first call has any effect.
pub fn init(capacity: u64, ttl_secs: u64) {
    let _ = SUMMARY_CACHE.set(build(capacity, ttl_secs));
}

fn cache() -> &'static Cache<SummaryKey, Arc<MonthlySummary>> {
    SUMMARY_CACHE.get_or_init(|| build(DEFAULT_CAPACITY, DEFAULT_TTL_SECS))
}

fn key(emp_id: &str, cycle: PayrollCycle) -> SummaryKey {
    (emp_id.to_string(), cycle)
}

pub async fn get(emp_id: &str, cycle: PayrollCycle) -> Option<Arc<MonthlySummary>> {
    cache().get(&key(emp_id, cycle)).await
}

/// Caches a summary built from rows read after `seen` was taken.
///
/// The entry is inserted first and the counter checked afterwards: an
/// invalidation that bumped the counter before the check is caught here, one
/// that bumps it later removes the entry itself.
async fn store(key: SummaryKey, summary: Arc<MonthlySummary>, seen: &Generations) {
    let slot = stripe(&key);
    cache().insert(key.clone(), summary).await;
    if INVALIDATIONS[slot].load(Ordering::SeqCst) != seen.0[slot] {
        cache().invalidate(&key).await;
    }
}

pub async fn put(summary: MonthlySummary, seen: &Generations) {
    let key = key(&summary.emp_id, summary.cycle);
    store(key, Arc::new(summary), seen).await;
}

/// Drops the cached summary of the cycle `date` belongs to. Call after the
/// attendance write has committed.
pub async fn invalidate(emp_id: &str, date: NaiveDate) {
    let key = key(emp_id, resolve_cycle(date));
    INVALIDATIONS[stripe(&key)].fetch_add(1, Ordering::SeqCst);
    cache().invalidate(&key).await;
}

/// Summary for one cycle, from the cache or rebuilt from stored records.
/// An empty cycle is returned as `PayrollError::EmptyCycle` and not cached.
pub async fn summary_for(
    pool: &MySqlPool,
    emp_id: &str,
    cycle: PayrollCycle,
) -> ServiceResult<Arc<MonthlySummary>> {
    if let Some(hit) = get(emp_id, cycle).await {
        return Ok(hit);
    }
    let seen = generations();
    let records = attendance_repo::fetch_cycle(pool, emp_id, cycle).await?;
    let summary = Arc::new(aggregate(emp_id, cycle, &records)?);
    store(key(emp_id, cycle), summary.clone(), &seen).await;
    Ok(summary)
}

/// Summarises one employee's batch of records and stores every cycle.
async fn batch_store(records: &[AttendanceRecord], seen: &Generations) -> Result<usize> {
    let Some(first) = records.first() else {
        return Ok(0);
    };
    let summaries = aggregate_all(&first.emp_id, records)?;
    let count = summaries.len();
    let futures: Vec<_> = summaries.into_iter().map(|s| put(s, seen)).collect();

    // Await all insertions concurrently
    futures::future::join_all(futures).await;
    Ok(count)
}

/// Load summaries of the most recent `cycles` payroll cycles (current one
/// included) into the cache.
pub async fn warmup_summary_cache(pool: &MySqlPool, cycles: u32) -> Result<()> {
    if cycles == 0 {
        return Ok(());
    }
    let mut earliest = resolve_cycle(Utc::now().date_naive());
    for _ in 1..cycles {
        earliest = earliest.prev();
    }
    let (since, _) = earliest.window()?;

    let seen = generations();
    let mut stream = attendance_repo::stream_since(pool, since);
    let mut batch: Vec<AttendanceRecord> = Vec::new();
    let mut employees = 0usize;
    let mut summaries = 0usize;

    while let Some(row) = stream.next().await {
        let record = AttendanceRecord::try_from(row?)?;

        // rows arrive grouped by employee
        if batch.first().is_some_and(|r| r.emp_id != record.emp_id) {
            summaries += batch_store(&batch, &seen).await?;
            employees += 1;
            batch.clear();
        }
        batch.push(record);
    }

    if !batch.is_empty() {
        summaries += batch_store(&batch, &seen).await?;
        employees += 1;
    }

    log::info!(
        "Summary cache warmup complete: {} summaries for {} employees (since {})",
        summaries,
        employees,
        since
    );

    Ok(())
}
