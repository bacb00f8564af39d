//! Moment quantum numbers and the canonical flat index set.

use std::fmt;

use mom_core::{ErrorInfo, MomError};
use serde::{Deserialize, Serialize};

/// Number of moment components carried per (L, M): unpolarized, cos 2Φ and sin 2Φ.
pub const MOMENT_COMPONENTS: u8 = 3;

fn index_error(code: &str, message: impl Into<String>) -> MomError {
    MomError::Index(ErrorInfo::new(code, message))
}

/// Quantum numbers (momentIndex, L, M) of one photoproduction moment H_i(L, M).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "QnMomentIndexRepr")]
pub struct QnMomentIndex {
    moment_index: u8,
    l: u32,
    m: u32,
}

#[derive(Deserialize)]
struct QnMomentIndexRepr {
    moment_index: u8,
    l: u32,
    m: u32,
}

impl TryFrom<QnMomentIndexRepr> for QnMomentIndex {
    type Error = MomError;

    fn try_from(repr: QnMomentIndexRepr) -> Result<Self, Self::Error> {
        let qn = Self {
            moment_index: repr.moment_index,
            l: repr.l,
            m: repr.m,
        };
        if !qn.is_well_formed() {
            return Err(index_error("invalid-qn", "malformed moment quantum numbers")
                .with_context("qn", qn.to_string()));
        }
        Ok(qn)
    }
}

impl QnMomentIndex {
    /// Validates and builds a moment label.
    ///
    /// Rejects `moment_index > 2`, negative L, `M` outside `0..=L` and the
    /// identically vanishing H_2(L, 0).
    pub fn new(moment_index: i32, l: i32, m: i32) -> Result<Self, MomError> {
        let describe = |err: MomError| {
            err.with_context("moment_index", moment_index.to_string())
                .with_context("l", l.to_string())
                .with_context("m", m.to_string())
        };
        if !(0..MOMENT_COMPONENTS as i32).contains(&moment_index) {
            return Err(describe(index_error(
                "invalid-moment-index",
                "moment index must be 0, 1 or 2",
            )));
        }
        if l < 0 {
            return Err(describe(index_error("invalid-l", "L must be non-negative")));
        }
        if m < 0 || m > l {
            return Err(describe(index_error("invalid-m", "M must satisfy 0 <= M <= L")));
        }
        if moment_index == 2 && m == 0 {
            return Err(describe(index_error(
                "vanishing-moment",
                "H_2(L, 0) vanishes identically and is not a moment",
            )));
        }
        Ok(Self {
            moment_index: moment_index as u8,
            l: l as u32,
            m: m as u32,
        })
    }

    /// Polarization component: 0 unpolarized, 1 cos 2Φ, 2 sin 2Φ.
    pub fn moment_index(&self) -> u8 {
        self.moment_index
    }

    /// Orbital quantum number L.
    pub fn l(&self) -> u32 {
        self.l
    }

    /// Projection M (non-negative).
    pub fn m(&self) -> u32 {
        self.m
    }

    /// Compact label such as `H1_4_2`, used for CSV headers and JSON keys.
    pub fn label(&self) -> String {
        format!("H{}_{}_{}", self.moment_index, self.l, self.m)
    }

    fn is_well_formed(&self) -> bool {
        self.moment_index < MOMENT_COMPONENTS
            && self.m <= self.l
            && !(self.moment_index == 2 && self.m == 0)
    }
}

impl fmt::Display for QnMomentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H_{}({}, {})", self.moment_index, self.l, self.m)
    }
}

/// Serialized form of a [`MomentIndexSet`]; the ordering is fully determined by `max_l`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct MomentIndexSetRepr {
    max_l: u32,
}

/// Ordered set of moment labels for `L ≤ max_l` with a dense flat-index lookup.
///
/// Ordering: momentIndex 0, 1, 2 outermost, then L ascending, then M ascending,
/// with H_2(L, 0) omitted. The set holds
/// `(max_l + 1)(max_l + 2) + max_l (max_l + 1) / 2` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MomentIndexSetRepr", into = "MomentIndexSetRepr")]
pub struct MomentIndexSet {
    max_l: u32,
    indices: Vec<QnMomentIndex>,
    lookup: Vec<Option<usize>>,
}

impl From<MomentIndexSetRepr> for MomentIndexSet {
    fn from(repr: MomentIndexSetRepr) -> Self {
        Self::new(repr.max_l)
    }
}

impl From<MomentIndexSet> for MomentIndexSetRepr {
    fn from(set: MomentIndexSet) -> Self {
        Self { max_l: set.max_l }
    }
}

impl MomentIndexSet {
    /// Builds the canonical set for all moments with `L ≤ max_l`.
    pub fn new(max_l: u32) -> Self {
        let triangle = Self::triangle_len(max_l);
        let mut indices = Vec::with_capacity(Self::expected_len(max_l));
        let mut lookup = vec![None; MOMENT_COMPONENTS as usize * triangle];
        for moment_index in 0..MOMENT_COMPONENTS {
            for l in 0..=max_l {
                for m in 0..=l {
                    if moment_index == 2 && m == 0 {
                        continue;
                    }
                    let qn = QnMomentIndex { moment_index, l, m };
                    lookup[Self::slot(max_l, &qn)] = Some(indices.len());
                    indices.push(qn);
                }
            }
        }
        Self {
            max_l,
            indices,
            lookup,
        }
    }

    /// Set sized for a wave set whose largest spin is `max_spin` (moments up to L = 2 ℓ_max).
    pub fn for_max_spin(max_spin: u32) -> Self {
        Self::new(2 * max_spin)
    }

    /// Closed-form set size for a given `max_l`.
    pub fn expected_len(max_l: u32) -> usize {
        let l = max_l as usize;
        (l + 1) * (l + 2) + l * (l + 1) / 2
    }

    fn triangle_len(max_l: u32) -> usize {
        let l = max_l as usize;
        (l + 1) * (l + 2) / 2
    }

    fn slot(max_l: u32, qn: &QnMomentIndex) -> usize {
        qn.moment_index as usize * Self::triangle_len(max_l)
            + (qn.l * (qn.l + 1) / 2 + qn.m) as usize
    }

    /// Largest L in the set.
    pub fn max_l(&self) -> u32 {
        self.max_l
    }

    /// Number of moments n.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Always false; every set contains at least H_0(0, 0).
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Labels in flat-index order.
    pub fn iter(&self) -> impl Iterator<Item = &QnMomentIndex> + '_ {
        self.indices.iter()
    }

    /// Labels as a slice in flat-index order.
    pub fn as_slice(&self) -> &[QnMomentIndex] {
        &self.indices
    }

    /// Label at `flat`, if in range.
    pub fn get(&self, flat: usize) -> Option<&QnMomentIndex> {
        self.indices.get(flat)
    }

    /// Flat index of `qn`; fails for labels that are malformed or exceed `max_l`.
    pub fn flat_index(&self, qn: &QnMomentIndex) -> Result<usize, MomError> {
        if !qn.is_well_formed() || qn.l > self.max_l {
            return Err(index_error("unknown-moment", "moment label not part of the index set")
                .with_context("qn", qn.to_string())
                .with_context("max_l", self.max_l.to_string()));
        }
        self.lookup[Self::slot(self.max_l, qn)].ok_or_else(|| {
            index_error("unknown-moment", "moment label not part of the index set")
                .with_context("qn", qn.to_string())
        })
    }

    /// Flat index of the normalization reference H_0(0, 0).
    pub fn reference_index(&self) -> usize {
        0
    }

    /// Fails unless `other` describes exactly the same ordering.
    pub fn ensure_same(&self, other: &MomentIndexSet) -> Result<(), MomError> {
        if self.max_l != other.max_l {
            return Err(index_error("index-set-mismatch", "moment index sets differ")
                .with_context("left_max_l", self.max_l.to_string())
                .with_context("right_max_l", other.max_l.to_string()));
        }
        Ok(())
    }

    /// Fails unless `len` matches the number of moments.
    pub fn ensure_len(&self, what: &str, len: usize) -> Result<(), MomError> {
        if len != self.len() {
            return Err(index_error("shape-mismatch", format!("{what} does not match the index set"))
                .with_context("expected", self.len().to_string())
                .with_context("actual", len.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_starts_with_reference() {
        let set = MomentIndexSet::new(2);
        let first = set.get(0).copied().expect("non-empty");
        assert_eq!(first, QnMomentIndex::new(0, 0, 0).expect("valid"));
        let labels: Vec<String> = set.iter().take(4).map(QnMomentIndex::label).collect();
        assert_eq!(labels, ["H0_0_0", "H0_1_0", "H0_1_1", "H0_2_0"]);
        let first_sin = QnMomentIndex::new(2, 1, 1).expect("valid");
        assert_eq!(set.flat_index(&first_sin).expect("present"), 12);
    }

    #[test]
    fn serde_keeps_only_max_l() {
        let set = MomentIndexSet::new(3);
        let json = serde_json::to_string(&set).expect("encode");
        assert_eq!(json, "{\"max_l\":3}");
        let back: MomentIndexSet = serde_json::from_str(&json).expect("decode");
        assert_eq!(back, set);
    }

    #[test]
    fn malformed_labels_do_not_decode() {
        let qn = QnMomentIndex::new(1, 3, 2).expect("valid");
        let json = serde_json::to_string(&qn).expect("encode");
        assert_eq!(serde_json::from_str::<QnMomentIndex>(&json).expect("decode"), qn);
        for bad in [
            r#"{"moment_index":3,"l":1,"m":0}"#,
            r#"{"moment_index":0,"l":1,"m":2}"#,
            r#"{"moment_index":2,"l":2,"m":0}"#,
        ] {
            assert!(serde_json::from_str::<QnMomentIndex>(bad).is_err(), "{bad}");
        }
    }
}
