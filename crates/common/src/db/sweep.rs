//! History sweep classification
//!
//! Pure logic shared by both store backends: given one kind's history rows
//! and its live entities, decide which rows break the charset, ownership,
//! collision, or redundancy rules. The store backends only fetch and delete;
//! every decision lives here where it can be unit tested.

use std::collections::HashMap;

use uuid::Uuid;

use crate::db::store::{ScopeKey, SweepReport};
use crate::slug::{is_valid_slug, Charset};

/// Minimal view of a history row for classification
#[derive(Clone, Debug)]
pub struct HistoryRow {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub scope: ScopeKey,
    pub old_slug: String,
}

/// Minimal view of a live entity for classification
#[derive(Clone, Debug)]
pub struct LiveRow {
    pub id: Uuid,
    pub scope: ScopeKey,
    pub slug: String,
}

/// Row ids per violation class. A row lands in at most one class, checked
/// in order: invalid charset, orphaned owner, collision with live content,
/// redundant self-address.
#[derive(Clone, Debug, Default)]
pub struct SweepVerdicts {
    pub invalid: Vec<Uuid>,
    pub orphaned: Vec<Uuid>,
    pub collisions: Vec<Uuid>,
    pub redundant: Vec<Uuid>,
}

impl SweepVerdicts {
    /// Every violating row id, across all classes
    pub fn all_ids(&self) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(
            self.invalid.len() + self.orphaned.len() + self.collisions.len() + self.redundant.len(),
        );
        ids.extend_from_slice(&self.invalid);
        ids.extend_from_slice(&self.orphaned);
        ids.extend_from_slice(&self.collisions);
        ids.extend_from_slice(&self.redundant);
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.invalid.is_empty()
            && self.orphaned.is_empty()
            && self.collisions.is_empty()
            && self.redundant.is_empty()
    }

    pub fn report(&self) -> SweepReport {
        SweepReport {
            invalid: self.invalid.len() as u64,
            orphaned: self.orphaned.len() as u64,
            collisions: self.collisions.len() as u64,
            redundant: self.redundant.len() as u64,
        }
    }

    /// Merge verdicts from another kind's pass
    pub fn extend(&mut self, other: SweepVerdicts) {
        self.invalid.extend(other.invalid);
        self.orphaned.extend(other.orphaned);
        self.collisions.extend(other.collisions);
        self.redundant.extend(other.redundant);
    }
}

/// Classify one kind's history rows against its live entities.
pub fn classify_history(charset: Charset, rows: &[HistoryRow], live: &[LiveRow]) -> SweepVerdicts {
    let owners: HashMap<Uuid, &LiveRow> = live.iter().map(|l| (l.id, l)).collect();
    let live_by_address: HashMap<(ScopeKey, &str), Uuid> = live
        .iter()
        .map(|l| ((l.scope, l.slug.as_str()), l.id))
        .collect();

    let mut verdicts = SweepVerdicts::default();

    for row in rows {
        if !is_valid_slug(charset, &row.old_slug) {
            verdicts.invalid.push(row.id);
            continue;
        }

        let Some(owner) = owners.get(&row.entity_id) else {
            verdicts.orphaned.push(row.id);
            continue;
        };

        if let Some(&live_id) = live_by_address.get(&(row.scope, row.old_slug.as_str())) {
            if live_id != row.entity_id {
                verdicts.collisions.push(row.id);
                continue;
            }
        }

        if owner.scope == row.scope && owner.slug == row.old_slug {
            verdicts.redundant.push(row.id);
        }
    }

    verdicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Category;

    fn row(entity_id: Uuid, scope: ScopeKey, old_slug: &str) -> HistoryRow {
        HistoryRow {
            id: Uuid::new_v4(),
            entity_id,
            scope,
            old_slug: old_slug.to_string(),
        }
    }

    fn live(id: Uuid, scope: ScopeKey, slug: &str) -> LiveRow {
        LiveRow {
            id,
            scope,
            slug: slug.to_string(),
        }
    }

    #[test]
    fn test_clean_history_passes() {
        let owner = Uuid::new_v4();
        let rows = vec![row(owner, ScopeKey::Global, "old-name")];
        let lives = vec![live(owner, ScopeKey::Global, "new-name")];

        let verdicts = classify_history(Charset::Ascii, &rows, &lives);
        assert!(verdicts.is_empty());
    }

    #[test]
    fn test_invalid_charset_detected() {
        let owner = Uuid::new_v4();
        let rows = vec![
            row(owner, ScopeKey::Global, "has space"),
            row(owner, ScopeKey::Global, "서울"),
        ];
        let lives = vec![live(owner, ScopeKey::Global, "current")];

        let verdicts = classify_history(Charset::Ascii, &rows, &lives);
        assert_eq!(verdicts.invalid.len(), 2);
        assert_eq!(verdicts.report().total(), 2);
    }

    #[test]
    fn test_orphaned_row_detected() {
        let rows = vec![row(Uuid::new_v4(), ScopeKey::Global, "ghost")];

        let verdicts = classify_history(Charset::Ascii, &rows, &[]);
        assert_eq!(verdicts.orphaned.len(), 1);
    }

    #[test]
    fn test_collision_with_other_live_slug() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        // a once held "shared", which b now uses as its current slug.
        let rows = vec![row(a, ScopeKey::Global, "shared")];
        let lives = vec![
            live(a, ScopeKey::Global, "a-current"),
            live(b, ScopeKey::Global, "shared"),
        ];

        let verdicts = classify_history(Charset::Ascii, &rows, &lives);
        assert_eq!(verdicts.collisions.len(), 1);
        assert!(verdicts.redundant.is_empty());
    }

    #[test]
    fn test_redundant_self_address() {
        let owner = Uuid::new_v4();
        let rows = vec![row(owner, ScopeKey::Global, "same")];
        let lives = vec![live(owner, ScopeKey::Global, "same")];

        let verdicts = classify_history(Charset::Ascii, &rows, &lives);
        assert_eq!(verdicts.redundant.len(), 1);
        assert!(verdicts.collisions.is_empty());
    }

    #[test]
    fn test_scoped_rows_do_not_cross_scopes() {
        let country_a = Uuid::new_v4();
        let country_b = Uuid::new_v4();
        let post = Uuid::new_v4();
        let scope_a = ScopeKey::CountryCategory {
            country_id: country_a,
            category: Category::Travel,
        };
        let scope_b = ScopeKey::CountryCategory {
            country_id: country_b,
            category: Category::Travel,
        };

        // The post moved from country A to country B keeping its slug.
        // The row under the old scope is neither a collision nor redundant.
        let rows = vec![row(post, scope_a, "seoul-trip")];
        let lives = vec![live(post, scope_b, "seoul-trip")];

        let verdicts = classify_history(Charset::Ascii, &rows, &lives);
        assert!(verdicts.is_empty());
    }

    #[test]
    fn test_invalid_takes_precedence_over_orphaned() {
        let rows = vec![row(Uuid::new_v4(), ScopeKey::Global, "bad slug")];

        let verdicts = classify_history(Charset::Ascii, &rows, &[]);
        assert_eq!(verdicts.invalid.len(), 1);
        assert!(verdicts.orphaned.is_empty());
    }
}
