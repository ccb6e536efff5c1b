//! Run-length patterns and pattern matching
//!
//! 1D decoding never looks at pixels directly; it looks at [`PatternRow`],
//! the run lengths of alternating dark/light segments of one scan line.
//! [`PatternView`] is a sliding window over such a row, and
//! [`FixedPattern`] matches a window against a reference shape such as a
//! start guard.
//!
//! By convention a PatternRow starts with a white run; when the first
//! pixel of the line is dark, an explicit zero-length white run is stored
//! so even indices are always spaces and odd indices bars relative to the
//! row start. Views carry their own polarity via their start offset.

/// Run lengths of one scan line. Reused across rows within one decode call.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PatternRow {
    runs: Vec<u16>,
}

impl PatternRow {
    /// 128 runs cover the widest standard symbology on one row.
    const RESERVE: usize = 128;

    pub fn new() -> Self {
        Self {
            runs: Vec::with_capacity(Self::RESERVE),
        }
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }

    pub fn push(&mut self, run: u16) {
        self.runs.push(run);
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn runs(&self) -> &[u16] {
        &self.runs
    }

    /// Reverse the run order in place, preserving the leading-space
    /// convention (a zero lead run is dropped / added as needed).
    pub fn reverse(&mut self) {
        if self.runs.is_empty() {
            return;
        }
        // Odd last index means the row ends on a bar, which becomes the
        // leading run after reversal.
        let ends_on_bar = (self.runs.len() - 1) % 2 == 1;
        if self.runs.first() == Some(&0) {
            self.runs.remove(0);
        }
        self.runs.reverse();
        if ends_on_bar {
            self.runs.insert(0, 0);
        }
    }

    /// View spanning the whole row.
    pub fn view(&self) -> PatternView<'_> {
        PatternView {
            row: &self.runs,
            start: 0,
            len: self.runs.len(),
        }
    }
}

impl std::fmt::Debug for PatternRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PatternRow{:?}", self.runs)
    }
}

impl From<Vec<u16>> for PatternRow {
    fn from(runs: Vec<u16>) -> Self {
        Self { runs }
    }
}

/// An immutable window of `len` runs starting at run index `start`.
#[derive(Clone, Copy)]
pub struct PatternView<'a> {
    row: &'a [u16],
    start: usize,
    len: usize,
}

impl<'a> PatternView<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Run index of the window start within the underlying row.
    pub fn start_index(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn get(&self, i: usize) -> u16 {
        self.row[self.start + i]
    }

    /// True when the first run of this window is a bar.
    pub fn starts_on_bar(&self) -> bool {
        self.start % 2 == 1 || (self.start == 0 && self.row.first() == Some(&0))
    }

    /// Sum of all runs in the window.
    pub fn sum(&self) -> u32 {
        self.row[self.start..self.start + self.len]
            .iter()
            .map(|&r| u32::from(r))
            .sum()
    }

    /// Pixel offset of the window start from the row start.
    pub fn pixels_in_front(&self) -> u32 {
        self.row[..self.start].iter().map(|&r| u32::from(r)).sum()
    }

    /// Pixel offset of the window end from the row start.
    pub fn pixels_until_end(&self) -> u32 {
        self.pixels_in_front() + self.sum()
    }

    /// Width of the light run immediately before the window, `u16::MAX`
    /// when the window touches the row start (an implicit infinite quiet
    /// zone).
    pub fn space_in_front(&self) -> u16 {
        match self.start {
            0 => u16::MAX,
            i => self.row[i - 1],
        }
    }

    /// Width of the light run immediately after the window, `u16::MAX`
    /// when the window touches the row end.
    pub fn space_behind(&self) -> u16 {
        match self.start + self.len {
            end if end >= self.row.len() => u16::MAX,
            end => self.row[end],
        }
    }

    /// Quiet-zone test: the space in front must be at least `scale` times
    /// the average module width of the window, assuming the window spans
    /// `modules` modules.
    pub fn has_quiet_zone_before(&self, scale: f32, modules: u32) -> bool {
        let module = self.sum() as f32 / modules as f32;
        f32::from(self.space_in_front()) >= scale * module
    }

    pub fn has_quiet_zone_after(&self, scale: f32, modules: u32) -> bool {
        let module = self.sum() as f32 / modules as f32;
        f32::from(self.space_behind()) >= scale * module
    }

    /// A new window of `len` runs starting `offset` runs after this
    /// window's start. `None` when it would run off the row.
    pub fn sub_view(&self, offset: usize, len: usize) -> Option<PatternView<'a>> {
        if self.start + offset + len > self.row.len() {
            return None;
        }
        Some(PatternView {
            row: self.row,
            start: self.start + offset,
            len,
        })
    }

    /// Slide forward by `step` runs keeping the same length.
    pub fn shifted(&self, step: usize) -> Option<PatternView<'a>> {
        self.sub_view(step, self.len)
    }

    /// Remaining runs from the window start to the end of the row.
    pub fn rest_of_row(&self) -> PatternView<'a> {
        PatternView {
            row: self.row,
            start: self.start,
            len: self.row.len() - self.start,
        }
    }
}

impl std::fmt::Debug for PatternView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PatternView{:?}@{}",
            &self.row[self.start..self.start + self.len],
            self.start
        )
    }
}

/// A compile-time pattern of `N` run weights summing to `SUM` modules.
#[derive(Clone, Copy, Debug)]
pub struct FixedPattern<const N: usize, const SUM: u16> {
    pub weights: [u16; N],
}

impl<const N: usize, const SUM: u16> FixedPattern<N, SUM> {
    pub const fn new(weights: [u16; N]) -> Self {
        Self { weights }
    }

    /// Match `view` against this pattern. Returns the estimated module
    /// width in pixels when every run is within `max_individual_variance`
    /// of its expected width, `None` otherwise. Zero-width runs never
    /// match a non-zero weight.
    pub fn match_view(&self, view: &PatternView<'_>, max_individual_variance: f32) -> Option<f32> {
        if view.len() != N {
            return None;
        }
        let total = view.sum();
        if total < SUM as u32 {
            return None;
        }
        let module = total as f32 / SUM as f32;
        for i in 0..N {
            let expected = self.weights[i] as f32 * module;
            let variance = (f32::from(view.get(i)) - expected).abs();
            if variance > max_individual_variance * module * self.weights[i].max(1) as f32 {
                return None;
            }
        }
        Some(module)
    }
}

/// Mean squared deviation of a window from reference weights, normalised
/// by the module size. Lower is better; returns `f32::INFINITY` for a
/// length mismatch or a degenerate window.
pub fn pattern_variance(view: &PatternView<'_>, weights: &[u16]) -> f32 {
    if view.len() != weights.len() {
        return f32::INFINITY;
    }
    let total = view.sum() as f32;
    let weight_sum: u16 = weights.iter().sum();
    if total <= 0.0 || weight_sum == 0 {
        return f32::INFINITY;
    }
    let module = total / f32::from(weight_sum);
    let mut variance = 0.0f32;
    for i in 0..weights.len() {
        let diff = f32::from(view.get(i)) - f32::from(weights[i]) * module;
        variance += (diff / module).powi(2);
    }
    variance / weights.len() as f32
}

/// Best match of `view` against a table of weight rows, under a variance
/// ceiling. Returns the winning row index.
pub fn best_pattern_match(
    view: &PatternView<'_>,
    table: &[&[u16]],
    max_variance: f32,
) -> Option<usize> {
    let mut best = max_variance;
    let mut winner = None;
    for (i, weights) in table.iter().enumerate() {
        let v = pattern_variance(view, weights);
        if v < best {
            best = v;
            winner = Some(i);
        }
    }
    winner
}

/// Threshold each run of `view` against `mid` module widths, yielding a
/// binary narrow/wide pattern (wide = 1 bit), most significant run first.
/// Used by the narrow/wide symbologies (Code 39 family, 2 of 5 family).
pub fn narrow_wide_bits(view: &PatternView<'_>, modules: u16) -> Option<u32> {
    let total = view.sum();
    let module = total as f32 / f32::from(modules);
    // Anything between narrow (1) and wide (>= 2) is split at 1.5 modules.
    let threshold = module * 1.5;
    let mut bits = 0u32;
    for i in 0..view.len() {
        let w = f32::from(view.get(i));
        if w <= 0.0 || w > module * 3.5 {
            return None;
        }
        bits = (bits << 1) | u32::from(w > threshold);
    }
    Some(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(runs: &[u16]) -> PatternRow {
        PatternRow::from(runs.to_vec())
    }

    #[test]
    fn test_view_polarity_and_sums() {
        let r = row(&[0, 2, 1, 3, 1]);
        let v = r.view().sub_view(1, 3).unwrap();
        assert!(v.starts_on_bar());
        assert_eq!(v.sum(), 6);
        assert_eq!(v.pixels_in_front(), 0);
        assert_eq!(v.space_behind(), 1);
    }

    #[test]
    fn test_quiet_zone() {
        let r = row(&[10, 1, 1, 3, 1, 1, 2]);
        let guard = r.view().sub_view(1, 5).unwrap();
        // 7 modules over 7 pixels -> module 1.0, 10 >= 5.0
        assert!(guard.has_quiet_zone_before(5.0, 7));
        assert!(!guard.has_quiet_zone_before(11.0, 7));
        assert!(guard.has_quiet_zone_after(2.0, 7));
    }

    #[test]
    fn test_fixed_pattern_match() {
        // QR finder ratio 1:1:3:1:1 at module size 2
        let pattern = FixedPattern::<5, 7>::new([1, 1, 3, 1, 1]);
        let r = row(&[4, 2, 2, 6, 2, 2, 4]);
        let v = r.view().sub_view(1, 5).unwrap();
        let module = pattern.match_view(&v, 0.5).unwrap();
        assert!((module - 2.0).abs() < 0.01);

        let noisy = row(&[4, 2, 5, 6, 2, 2, 4]);
        assert!(pattern
            .match_view(&noisy.view().sub_view(1, 5).unwrap(), 0.5)
            .is_none());
    }

    #[test]
    fn test_variance_ranking() {
        let r = row(&[0, 2, 1, 2, 2, 1]);
        let v = r.view().sub_view(1, 5).unwrap();
        let table: &[&[u16]] = &[&[1, 1, 1, 1, 1], &[2, 1, 2, 2, 1], &[1, 2, 1, 1, 2]];
        assert_eq!(best_pattern_match(&v, table, 0.5), Some(1));
    }

    #[test]
    fn test_narrow_wide() {
        // widths 1,3,1,1 with 6 modules total -> wide at index 1
        let r = row(&[0, 1, 3, 1, 1]);
        let v = r.view().sub_view(1, 4).unwrap();
        assert_eq!(narrow_wide_bits(&v, 6), Some(0b0100));
    }

    #[test]
    fn test_reverse_round_trip() {
        let mut r = row(&[0, 2, 1, 3]);
        r.reverse();
        assert_eq!(r.runs(), &[0, 3, 1, 2]);
        r.reverse();
        assert_eq!(r.runs(), &[0, 2, 1, 3]);

        let mut r = row(&[1, 2]);
        r.reverse();
        assert_eq!(r.runs(), &[0, 2, 1]);
    }
}
