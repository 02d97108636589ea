//! Junction records and extension slots
//!
//! Every junction has five slots: one per forward base (the k-mer extended by
//! A, C, G or T) and one backward slot (the k-mer's reverse complement
//! walking away from it). Slot numbers 0..5 are used in arrays and in the
//! junction text format.

use std::fmt;

use crate::error::{AssemblyError, Result};
use crate::oracle::ExtensionSet;

/// Number of extension slots per junction
pub const NUM_SLOTS: usize = 5;

/// An extension slot of a junction or contig node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Extension {
    /// Append this base (0..4) to the k-mer
    Forward(u8),
    /// Leave through the reverse complement
    Backward,
}

impl Extension {
    pub const FORWARD: [Extension; 4] = [
        Extension::Forward(0),
        Extension::Forward(1),
        Extension::Forward(2),
        Extension::Forward(3),
    ];

    pub const ALL: [Extension; NUM_SLOTS] = [
        Extension::Forward(0),
        Extension::Forward(1),
        Extension::Forward(2),
        Extension::Forward(3),
        Extension::Backward,
    ];

    /// Dense slot number, 0..5
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Extension::Forward(base) => (base & 3) as usize,
            Extension::Backward => 4,
        }
    }

    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0..=3 => Some(Extension::Forward(index as u8)),
            4 => Some(Extension::Backward),
            _ => None,
        }
    }

    #[inline]
    pub fn is_forward(self) -> bool {
        matches!(self, Extension::Forward(_))
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extension::Forward(base) => write!(f, "+{}", crate::kmer::base_char(*base) as char),
            Extension::Backward => write!(f, "-"),
        }
    }
}

/// Branching point: validity, read coverage and known distances per slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Junction {
    pub valid: [bool; NUM_SLOTS],
    pub coverage: [u32; NUM_SLOTS],
    /// Bases to the next junction through the slot, 0 if unknown
    pub distance: [u32; NUM_SLOTS],
}

impl Junction {
    /// Junction with the given valid forward extensions; the backward slot is
    /// always valid
    pub fn new(forward: ExtensionSet) -> Self {
        let flags = forward.as_flags();
        Self {
            valid: [flags[0], flags[1], flags[2], flags[3], true],
            ..Default::default()
        }
    }

    pub fn num_valid_forward(&self) -> usize {
        self.valid[..4].iter().filter(|&&v| v).count()
    }

    /// Two or more valid forward extensions
    pub fn is_complex(&self) -> bool {
        self.num_valid_forward() >= 2
    }

    /// Two or more forward extensions each seen at least `min_coverage` times
    pub fn is_solid(&self, min_coverage: u32) -> bool {
        (0..4)
            .filter(|&i| self.valid[i] && self.coverage[i] >= min_coverage)
            .count()
            >= 2
    }

    pub fn add_coverage(&mut self, slot: Extension) {
        let c = &mut self.coverage[slot.index()];
        *c = c.saturating_add(1);
    }

    /// Record the distance through `slot` if it is not known yet
    pub fn link(&mut self, slot: Extension, distance: u32) {
        let d = &mut self.distance[slot.index()];
        if *d == 0 {
            *d = distance;
        }
    }

    pub fn distance(&self, slot: Extension) -> Option<u32> {
        match self.distance[slot.index()] {
            0 => None,
            d => Some(d),
        }
    }

    /// Parse the `VALID\tCOV\tDIST` columns; `line` is used for error reporting
    pub fn parse_columns(valid: &str, coverage: &str, distance: &str, line: usize) -> Result<Self> {
        if valid.len() != NUM_SLOTS {
            return Err(AssemblyError::parse(
                line,
                format!("validity field '{}' must have {} characters", valid, NUM_SLOTS),
            ));
        }
        let mut junction = Junction::default();
        for (i, c) in valid.chars().enumerate() {
            junction.valid[i] = match c {
                '0' => false,
                '1' => true,
                other => {
                    return Err(AssemblyError::parse(
                        line,
                        format!("invalid validity flag '{}'", other),
                    ));
                }
            };
        }
        junction.coverage = parse_counts(coverage, line)?;
        junction.distance = parse_counts(distance, line)?;
        Ok(junction)
    }
}

fn parse_counts(field: &str, line: usize) -> Result<[u32; NUM_SLOTS]> {
    let values: Vec<&str> = field.split(',').collect();
    if values.len() != NUM_SLOTS {
        return Err(AssemblyError::parse(
            line,
            format!("expected {} comma-separated values, got '{}'", NUM_SLOTS, field),
        ));
    }
    let mut out = [0u32; NUM_SLOTS];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = value
            .trim()
            .parse()
            .map_err(|e| AssemblyError::parse(line, format!("bad count '{}': {}", value, e)))?;
    }
    Ok(out)
}

fn join(values: &[u32; NUM_SLOTS]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for Junction {
    /// `VALID\tCOV\tDIST`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let valid: String = self.valid.iter().map(|&v| if v { '1' } else { '0' }).collect();
        write!(f, "{}\t{}\t{}", valid, join(&self.coverage), join(&self.distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_index_round_trip() {
        for (i, ext) in Extension::ALL.iter().enumerate() {
            assert_eq!(ext.index(), i);
            assert_eq!(Extension::from_index(i), Some(*ext));
        }
        assert_eq!(Extension::from_index(5), None);
        assert!(!Extension::Backward.is_forward());
    }

    #[test]
    fn test_junction_validity() {
        let mut exts = ExtensionSet::default();
        exts.insert(0);
        exts.insert(3);
        let mut j = Junction::new(exts);
        assert_eq!(j.valid, [true, false, false, true, true]);
        assert!(j.is_complex());
        assert!(!j.is_solid(1));
        j.add_coverage(Extension::Forward(0));
        j.add_coverage(Extension::Forward(3));
        assert!(j.is_solid(1));
        assert!(!j.is_solid(2));
    }

    #[test]
    fn test_link_keeps_first_distance() {
        let mut j = Junction::default();
        assert_eq!(j.distance(Extension::Backward), None);
        j.link(Extension::Backward, 12);
        j.link(Extension::Backward, 30);
        assert_eq!(j.distance(Extension::Backward), Some(12));
    }

    #[test]
    fn test_display_and_parse() {
        let mut j = Junction::default();
        j.valid = [true, true, false, false, true];
        j.coverage = [3, 1, 0, 0, 4];
        j.distance = [10, 0, 0, 0, 7];
        let text = j.to_string();
        assert_eq!(text, "11001\t3,1,0,0,4\t10,0,0,0,7");
        let cols: Vec<&str> = text.split('\t').collect();
        assert_eq!(Junction::parse_columns(cols[0], cols[1], cols[2], 1).unwrap(), j);
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let err = Junction::parse_columns("1100", "0,0,0,0,0", "0,0,0,0,0", 9).unwrap_err();
        assert!(err.to_string().contains("line 9"));
        let err = Junction::parse_columns("11002", "0,0,0,0,0", "0,0,0,0,0", 2).unwrap_err();
        assert!(matches!(err, AssemblyError::Parse { line: 2, .. }));
        assert!(Junction::parse_columns("11000", "0,0,0,0", "0,0,0,0,0", 3).is_err());
    }
}
