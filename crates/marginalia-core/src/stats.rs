//! Derived document statistics
//!
//! [`compute_stats`] is the single source of truth: the cached copy in a
//! document's header is only ever written from its result, never bumped
//! in place.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::document::{format, Document, HeaderBlock};
use crate::models::StatsCache;
use crate::storage::{MetadataStore, StorageResult};

/// Counters derived from a document body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub highlights_total: usize,
    pub insights_created: usize,
}

/// Count highlight openings and insight reference lines
pub fn compute_stats(body: &str) -> Stats {
    body.lines().fold(Stats::default(), |mut stats, line| {
        if format::is_quote_opener(line) {
            stats.highlights_total += 1;
        } else if format::parse_insight_link(line).is_some() {
            stats.insights_created += 1;
        }
        stats
    })
}

/// Store freshly computed stats in a header
pub fn write_cache(header: &mut HeaderBlock, stats: Stats, now: DateTime<Utc>) -> StatsCache {
    header.set(
        format::keys::HIGHLIGHTS_TOTAL,
        &stats.highlights_total.to_string(),
    );
    header.set(
        format::keys::INSIGHTS_CREATED,
        &stats.insights_created.to_string(),
    );
    header.set(
        format::keys::STATS_UPDATED,
        &now.to_rfc3339_opts(SecondsFormat::Secs, true),
    );

    StatsCache {
        highlights_total: stats.highlights_total,
        insights_created: stats.insights_created,
        updated_at: now,
    }
}

/// Read the cached stats from a header, if all fields are present
pub fn read_cache(header: &HeaderBlock) -> Option<StatsCache> {
    let highlights_total = header.get(format::keys::HIGHLIGHTS_TOTAL)?.parse().ok()?;
    let insights_created = header.get(format::keys::INSIGHTS_CREATED)?.parse().ok()?;
    let updated_at = DateTime::parse_from_rfc3339(&header.get(format::keys::STATS_UPDATED)?)
        .ok()?
        .with_timezone(&Utc);

    Some(StatsCache {
        highlights_total,
        insights_created,
        updated_at,
    })
}

/// Recompute an in-memory document's cache from its body
pub fn refresh_document(doc: &mut Document, now: DateTime<Utc>) -> StatsCache {
    let stats = compute_stats(&doc.body());
    write_cache(doc.header_mut(), stats, now)
}

/// Recompute the cache of a stored document through its metadata store
pub fn refresh_cache<M: MetadataStore>(
    metadata: &mut M,
    path: &Path,
    now: DateTime<Utc>,
) -> StorageResult<StatsCache> {
    metadata.process_header(path, |header, body| {
        write_cache(header, compute_stats(body), now)
    })
}
