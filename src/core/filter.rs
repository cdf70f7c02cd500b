//! Composable frame filters.
//!
//! A [`FrameFilter`] is a pure predicate over [`Frame`]. Filters are built
//! from the constructors below and combined with [`FrameFilter::and`],
//! [`FrameFilter::or`] and [`FrameFilter::not`]. The [`FrameFilter::any`]
//! filter matches everything and acts as the identity for `and`/`or`, which
//! keeps dynamically assembled filter chains free of special cases.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::core::frame::Frame;

type Predicate = Arc<dyn Fn(&Frame) -> bool + Send + Sync>;

/// A predicate over frames used by Mux subscriptions and service filters.
///
/// Cloning is cheap (reference counted).
#[derive(Clone, Default)]
pub struct FrameFilter(Option<Predicate>);

impl FrameFilter {
    /// The match-all filter; identity element for `and`/`or`.
    pub fn any() -> Self {
        FrameFilter(None)
    }

    /// Wrap an arbitrary predicate.
    pub fn from_fn(f: impl Fn(&Frame) -> bool + Send + Sync + 'static) -> Self {
        FrameFilter(Some(Arc::new(f)))
    }

    /// Match frames with the exact identifier.
    pub fn id(id: u32) -> Self {
        Self::from_fn(move |f| f.id == id)
    }

    /// Match any of the provided identifiers.
    pub fn ids(ids: impl IntoIterator<Item = u32>) -> Self {
        let set: HashSet<u32> = ids.into_iter().collect();
        Self::from_fn(move |f| set.contains(&f.id))
    }

    /// Match identifiers within `[lo, hi]` inclusive; swapped defensively
    /// when given inverted.
    pub fn id_range(lo: u32, hi: u32) -> Self {
        let (lo, hi) = if hi < lo { (hi, lo) } else { (lo, hi) };
        Self::from_fn(move |f| f.id >= lo && f.id <= hi)
    }

    /// Match when `(frame.id & mask) == (key & mask)`.
    pub fn mask(key: u32, mask: u32) -> Self {
        let want = key & mask;
        Self::from_fn(move |f| f.id & mask == want)
    }

    /// Match standard (11-bit) identifiers only.
    pub fn standard_only() -> Self {
        Self::from_fn(|f| !f.extended)
    }

    /// Match extended (29-bit) identifiers only.
    pub fn extended_only() -> Self {
        Self::from_fn(|f| f.extended)
    }

    /// Match data (non-RTR) frames only.
    pub fn data_only() -> Self {
        Self::from_fn(|f| !f.rtr)
    }

    /// Match remote transmission request frames only.
    pub fn rtr_only() -> Self {
        Self::from_fn(|f| f.rtr)
    }

    /// Match frames with data length `<= n`.
    pub fn len_at_most(n: u8) -> Self {
        Self::from_fn(move |f| f.len <= n)
    }

    /// Match frames with data length `== n`.
    pub fn len_exactly(n: u8) -> Self {
        Self::from_fn(move |f| f.len == n)
    }

    /// Evaluate the filter against a frame.
    #[inline]
    pub fn matches(&self, frame: &Frame) -> bool {
        match &self.0 {
            None => true,
            Some(p) => p(frame),
        }
    }

    /// Both filters must match. An [`any`](Self::any) operand yields the
    /// other operand unchanged.
    pub fn and(self, other: FrameFilter) -> FrameFilter {
        match (self.0, other.0) {
            (None, b) => FrameFilter(b),
            (a, None) => FrameFilter(a),
            (Some(a), Some(b)) => FrameFilter::from_fn(move |f| a(f) && b(f)),
        }
    }

    /// Either filter may match. An [`any`](Self::any) operand yields the
    /// other operand unchanged.
    pub fn or(self, other: FrameFilter) -> FrameFilter {
        match (self.0, other.0) {
            (None, b) => FrameFilter(b),
            (a, None) => FrameFilter(a),
            (Some(a), Some(b)) => FrameFilter::from_fn(move |f| a(f) || b(f)),
        }
    }

    /// Invert the filter. Inverting [`any`](Self::any) still matches
    /// everything.
    pub fn not(self) -> FrameFilter {
        match self.0 {
            None => FrameFilter::any(),
            Some(p) => FrameFilter::from_fn(move |f| !p(f)),
        }
    }
}

impl fmt::Debug for FrameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => f.write_str("FrameFilter(any)"),
            Some(_) => f.write_str("FrameFilter(predicate)"),
        }
    }
}
