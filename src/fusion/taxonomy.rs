use std::collections::HashMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Coarse severity classification used to pick among simultaneous
/// competing distraction signals. Ordering matters: `Critical` wins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PriorityTier {
    Medium,
    High,
    Critical,
}

impl PriorityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::Critical => "critical",
            PriorityTier::High => "high",
            PriorityTier::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TaxonomyEntry {
    pub tier: PriorityTier,
    pub severity: f32,
}

/// Static mapping from known object labels to distraction tier and severity.
///
/// Built once at session start and validated there; lookups are exact matches
/// on the lowercased, trimmed label. Unknown labels are ignored by callers
/// rather than fuzzy-matched at runtime.
#[derive(Debug, Clone)]
pub struct DistractionTaxonomy {
    entries: HashMap<String, TaxonomyEntry>,
}

impl DistractionTaxonomy {
    pub fn from_entries(entries: &[(&str, PriorityTier, f32)]) -> Result<Self> {
        let mut map = HashMap::with_capacity(entries.len());
        for (label, tier, severity) in entries {
            let key = label.trim().to_lowercase();
            if key.is_empty() {
                bail!("taxonomy label must not be empty");
            }
            if !(0.0..=1.0).contains(severity) {
                bail!("severity {severity} for label '{key}' is outside [0,1]");
            }
            if map
                .insert(
                    key.clone(),
                    TaxonomyEntry {
                        tier: *tier,
                        severity: *severity,
                    },
                )
                .is_some()
            {
                bail!("duplicate taxonomy label '{key}'");
            }
        }
        Ok(Self { entries: map })
    }

    pub fn lookup(&self, label: &str) -> Option<TaxonomyEntry> {
        self.entries.get(&label.trim().to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DistractionTaxonomy {
    /// The built-in label set. Phones, tablets, and screens held in hand are
    /// the worst offenders; peripherals and reading material rank lower.
    fn default() -> Self {
        use PriorityTier::*;
        Self::from_entries(&[
            ("cell phone", Critical, 1.0),
            ("phone", Critical, 1.0),
            ("tablet", Critical, 1.0),
            ("laptop", High, 0.8),
            ("tv", High, 0.8),
            ("monitor", High, 0.8),
            ("screen", High, 0.8),
            ("remote", High, 0.7),
            ("keyboard", High, 0.7),
            ("mouse", High, 0.7),
            ("book", Medium, 0.6),
            ("cup", Medium, 0.5),
            ("bottle", Medium, 0.5),
            ("scissors", Medium, 0.5),
        ])
        .expect("built-in taxonomy is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering_puts_critical_first() {
        assert!(PriorityTier::Critical > PriorityTier::High);
        assert!(PriorityTier::High > PriorityTier::Medium);
    }

    #[test]
    fn lookup_is_case_and_whitespace_insensitive() {
        let taxonomy = DistractionTaxonomy::default();
        let entry = taxonomy.lookup("  Cell Phone ").unwrap();
        assert_eq!(entry.tier, PriorityTier::Critical);
    }

    #[test]
    fn unknown_labels_are_not_matched_by_substring() {
        let taxonomy = DistractionTaxonomy::default();
        assert!(taxonomy.lookup("cell phone case").is_none());
        assert!(taxonomy.lookup("person").is_none());
    }

    #[test]
    fn rejects_out_of_range_severity() {
        let result =
            DistractionTaxonomy::from_entries(&[("phone", PriorityTier::Critical, 1.5)]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_duplicate_labels() {
        let result = DistractionTaxonomy::from_entries(&[
            ("phone", PriorityTier::Critical, 1.0),
            ("Phone", PriorityTier::High, 0.8),
        ]);
        assert!(result.is_err());
    }
}
