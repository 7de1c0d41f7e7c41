use loo_types::{LooId, LooProperties};

use crate::error::StoreResult;
use crate::traits::LooReader;

/// Properties rebuilt from a loo's report diffs.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayResult {
    pub loo: LooId,
    pub applied_reports: u64,
    pub properties: LooProperties,
}

/// Deterministic reconstruction of loo state from history.
pub struct ReplayEngine;

impl ReplayEngine {
    /// Merge every report diff of `loo`, oldest first, onto empty properties.
    pub fn replay_loo<R: LooReader + ?Sized>(reader: &R, loo: &LooId) -> StoreResult<ReplayResult> {
        let history = reader.loo_reports(loo)?;
        let mut properties = LooProperties::default();
        for report in &history {
            properties.merge(&report.diff);
        }
        Ok(ReplayResult {
            loo: *loo,
            applied_reports: history.len() as u64,
            properties,
        })
    }

    /// Whether the stored projection equals the replayed one. A missing loo
    /// never converges.
    pub fn verify_projection<R: LooReader + ?Sized>(reader: &R, loo: &LooId) -> StoreResult<bool> {
        let Some(stored) = reader.loo(loo)? else {
            return Ok(false);
        };
        let replayed = Self::replay_loo(reader, loo)?;
        Ok(replayed.properties == stored.properties)
    }
}
