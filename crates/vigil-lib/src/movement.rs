use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementType {
    Fixation,
    Saccade,
    NotFound,
    Unknown,
}

impl MovementType {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => MovementType::Fixation,
            1 => MovementType::Saccade,
            2 => MovementType::NotFound,
            _ => MovementType::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MovementType::Fixation => "Fixation",
            MovementType::Saccade => "Saccade",
            MovementType::NotFound => "NotFound",
            MovementType::Unknown => "Unknown",
        }
    }

    pub fn color(&self) -> MarkerColor {
        match self {
            MovementType::Fixation => MarkerColor::Green,
            MovementType::Saccade => MarkerColor::Red,
            MovementType::NotFound => MarkerColor::Black,
            MovementType::Unknown => MarkerColor::Gray,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Green,
    Red,
    Black,
    Gray,
}

impl MarkerColor {
    pub fn hex(&self) -> &'static str {
        match self {
            MarkerColor::Green => "#2ca02c",
            MarkerColor::Red => "#d62728",
            MarkerColor::Black => "#000000",
            MarkerColor::Gray => "#808080",
        }
    }

    pub fn rgb(&self) -> u32 {
        match self {
            MarkerColor::Green => 0x2CA02C,
            MarkerColor::Red => 0xD62728,
            MarkerColor::Black => 0x000000,
            MarkerColor::Gray => 0x808080,
        }
    }
}

/// Display name and color for a movement-type code. Never fails.
pub fn label(code: i64) -> (&'static str, MarkerColor) {
    let kind = MovementType::from_code(code);
    (kind.name(), kind.color())
}

/// Counts of consecutive `(from, to)` code pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionTally {
    counts: BTreeMap<(i64, i64), usize>,
}

/// One labelled edge of the transition diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub from: i64,
    pub to: i64,
    pub label: String,
    pub count: usize,
}

impl TransitionTally {
    pub fn get(&self, from: i64, to: i64) -> usize {
        self.counts.get(&(from, to)).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((i64, i64), usize)> + '_ {
        self.counts.iter().map(|(k, v)| (*k, *v))
    }

    /// Edges ordered by `(from, to)` with human-readable labels.
    pub fn flows(&self) -> Vec<Flow> {
        self.iter()
            .map(|((from, to), count)| Flow {
                from,
                to,
                label: format!("{} → {}", label(from).0, label(to).0),
                count,
            })
            .collect()
    }
}

/// Tally transitions between consecutive codes.
pub fn tally(codes: &[i64]) -> TransitionTally {
    let mut counts = BTreeMap::new();
    for w in codes.windows(2) {
        *counts.entry((w[0], w[1])).or_insert(0) += 1;
    }
    TransitionTally { counts }
}

/// Occurrences of each movement type, keyed by display name.
pub fn count_types(codes: &[i64]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for &code in codes {
        *counts.entry(label(code).0).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_consecutive_pairs() {
        let t = tally(&[0, 1, 1, 2]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(0, 1), 1);
        assert_eq!(t.get(1, 1), 1);
        assert_eq!(t.get(1, 2), 1);
        assert_eq!(t.get(2, 0), 0);
        assert_eq!(t.total(), 3);
    }

    #[test]
    fn short_sequences_give_empty_tally() {
        assert!(tally(&[]).is_empty());
        assert!(tally(&[1]).is_empty());
    }

    #[test]
    fn unknown_codes_are_gray() {
        assert_eq!(label(99), ("Unknown", MarkerColor::Gray));
        assert_eq!(label(-1), ("Unknown", MarkerColor::Gray));
        assert_eq!(label(0), ("Fixation", MarkerColor::Green));
        assert_eq!(label(1).1.hex(), "#d62728");
        assert_eq!(label(2), ("NotFound", MarkerColor::Black));
    }

    #[test]
    fn flows_are_labelled_in_order() {
        let flows = tally(&[1, 0, 1, 0, 0]).flows();
        let labels: Vec<_> = flows.iter().map(|f| (f.label.as_str(), f.count)).collect();
        assert_eq!(
            labels,
            vec![
                ("Fixation → Fixation", 1),
                ("Fixation → Saccade", 1),
                ("Saccade → Fixation", 2)
            ]
        );
    }

    #[test]
    fn counts_types_by_name() {
        let counts = count_types(&[0, 0, 1, 7, 2]);
        assert_eq!(counts.get("Fixation"), Some(&2));
        assert_eq!(counts.get("Saccade"), Some(&1));
        assert_eq!(counts.get("NotFound"), Some(&1));
        assert_eq!(counts.get("Unknown"), Some(&1));
    }
}
