//! Primary-key reconciliation between the two ingestion backends.
//!
//! Dual writes are not atomic, so a crash between the two commits can leave a
//! batch in one backend only. [`reconcile`] finds such one-sided records and,
//! when asked, copies them across with idempotent upserts. It compares keys,
//! not row contents.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, warn};
use udise_core::store::AdminStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
  /// Keys present in the secondary only.
  pub missing_in_primary:   Vec<i64>,
  /// Keys present in the primary only.
  pub missing_in_secondary: Vec<i64>,
  /// Records copied across when repair was requested.
  pub repaired:             usize,
}

impl ReconcileReport {
  pub fn is_consistent(&self) -> bool {
    self.missing_in_primary.is_empty() && self.missing_in_secondary.is_empty()
  }
}

/// Compare the key sets of `primary` and `secondary`; with `repair`, upsert
/// each one-sided record into the backend that lacks it.
pub async fn reconcile<S: AdminStore>(
  primary: &S,
  secondary: &S,
  repair: bool,
) -> Result<ReconcileReport, S::Error> {
  let in_primary: BTreeSet<i64> = primary.list_codes().await?.into_iter().collect();
  let in_secondary: BTreeSet<i64> = secondary.list_codes().await?.into_iter().collect();

  let mut report = ReconcileReport {
    missing_in_primary:   in_secondary.difference(&in_primary).copied().collect(),
    missing_in_secondary: in_primary.difference(&in_secondary).copied().collect(),
    repaired:             0,
  };

  if !report.is_consistent() {
    warn!(
      missing_in_primary = report.missing_in_primary.len(),
      missing_in_secondary = report.missing_in_secondary.len(),
      "backends have diverged"
    );
  }

  if repair {
    report.repaired += copy_missing(secondary, primary, &report.missing_in_primary).await?;
    report.repaired += copy_missing(primary, secondary, &report.missing_in_secondary).await?;
    info!(repaired = report.repaired, "reconciliation repair finished");
  }

  Ok(report)
}

async fn copy_missing<S: AdminStore>(from: &S, to: &S, codes: &[i64]) -> Result<usize, S::Error> {
  let mut copied = 0;
  for &code in codes {
    // The record may have vanished since the key scan; skip it if so.
    if let Some(record) = from.get(code).await? {
      to.upsert(&record).await?;
      copied += 1;
    }
  }
  Ok(copied)
}
