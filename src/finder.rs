//! Concentric finder pattern location
//!
//! The QR family, Aztec and MaxiCode all anchor on nested square or ring
//! patterns with fixed run-length ratios (1:1:3:1:1 for a QR finder,
//! 1:1:1:1:1:1:1 for an Aztec bullseye). This module scans a bit matrix
//! for such patterns: a horizontal sweep proposes candidates, then
//! vertical and diagonal passes through the candidate center must agree
//! before it survives. Candidates close in position and module size are
//! merged.

use crate::bits::BitMatrix;
use crate::verbosity::zx_debug;

/// A located concentric pattern center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderPattern {
    pub x: f32,
    pub y: f32,
    /// Estimated single-module width in pixels.
    pub module_size: f32,
    /// Number of scan sightings merged into this center.
    pub count: u32,
}

impl FinderPattern {
    fn combine(&mut self, x: f32, y: f32, module_size: f32) {
        let n = self.count as f32;
        self.x = (self.x * n + x) / (n + 1.0);
        self.y = (self.y * n + y) / (n + 1.0);
        self.module_size = (self.module_size * n + module_size) / (n + 1.0);
        self.count += 1;
    }
}

/// Individual run tolerance, in modules, for one ring width.
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;
/// Tolerance for the mean deviation across all rings.
const MAX_MEAN_VARIANCE: f32 = 0.25;

/// Locate all centers matching `pattern` (odd length, dark first).
/// `try_harder` scans every row instead of subsampling.
pub fn find_concentric_patterns(
    matrix: &BitMatrix,
    pattern: &[u16],
    try_harder: bool,
) -> Vec<FinderPattern> {
    debug_assert!(pattern.len() % 2 == 1);
    let mut found: Vec<FinderPattern> = Vec::new();
    let height = matrix.height();
    let row_step = if try_harder {
        1
    } else {
        (height / 128).max(1)
    };

    let mut runs: Vec<(usize, usize)> = Vec::new(); // (start x, length)
    let mut y = row_step.saturating_sub(1);
    while y < height {
        collect_row_runs(matrix, y, &mut runs);
        if runs.is_empty() {
            y += row_step;
            continue;
        }
        // Windows must start on a dark run; runs alternate, so dark runs
        // sit at a fixed parity.
        let first_dark = usize::from(!matrix.get(runs[0].0, y));
        let n = pattern.len();
        let mut i = first_dark;
        while i + n <= runs.len() {
            let window = &runs[i..i + n];
            if let Some(module) = match_ratios(window, pattern) {
                let mid = &window[n / 2];
                let cx = mid.0 as f32 + mid.1 as f32 / 2.0;
                if let Some(p) = verify_center(matrix, cx, y as f32, pattern, module) {
                    merge_candidate(&mut found, p);
                    // Skip past this pattern on the row.
                    i += n - 2;
                }
            }
            i += 2;
        }
        y += row_step;
    }

    zx_debug!(2, "concentric finder: {} centers for {:?}", found.len(), pattern);
    found
}

fn collect_row_runs(matrix: &BitMatrix, y: usize, runs: &mut Vec<(usize, usize)>) {
    runs.clear();
    let row = matrix.row(y);
    let mut start = 0;
    for x in 1..=row.len() {
        if x == row.len() || row[x] != row[start] {
            runs.push((start, x - start));
            start = x;
        }
    }
}

/// Match a run window against the reference ratios. Returns the module
/// size estimate on success.
fn match_ratios(window: &[(usize, usize)], pattern: &[u16]) -> Option<f32> {
    let total: usize = window.iter().map(|r| r.1).sum();
    let weight: u16 = pattern.iter().sum();
    if total < weight as usize {
        return None;
    }
    let module = total as f32 / f32::from(weight);
    let mut mean_variance = 0.0;
    for (run, &w) in window.iter().zip(pattern) {
        let variance = (run.1 as f32 - f32::from(w) * module).abs() / module;
        if variance > MAX_INDIVIDUAL_VARIANCE * f32::from(w.max(1)) {
            return None;
        }
        mean_variance += variance;
    }
    (mean_variance / pattern.len() as f32 <= MAX_MEAN_VARIANCE).then_some(module)
}

/// Walk along (dx, dy) from the candidate center and test the pattern
/// ratios on that axis. Returns the refined center position along the
/// axis and the axis module size.
fn cross_check(
    matrix: &BitMatrix,
    cx: f32,
    cy: f32,
    dx: i32,
    dy: i32,
    pattern: &[u16],
    module: f32,
) -> Option<(f32, f32, f32)> {
    let n = pattern.len();
    let half = n / 2;
    let (w, h) = (matrix.width() as i32, matrix.height() as i32);
    let inside =
        |x: i32, y: i32| x >= 0 && y >= 0 && x < w && y < h && matrix.get(x as usize, y as usize);
    let in_bounds = |x: i32, y: i32| x >= 0 && y >= 0 && x < w && y < h;

    let (x0, y0) = (cx.round() as i32, cy.round() as i32);
    if !inside(x0, y0) {
        return None;
    }
    // The largest credible run: generous slack over the expected width.
    let limit = |weight: u16| (module * f32::from(weight) * 2.0 + 3.0) as i32;

    // Walk in the negative direction through rings half..0.
    let mut neg = [0i32; 16];
    let (mut x, mut y) = (x0, y0);
    for ring in (0..=half).rev() {
        let want_dark = (half - ring) % 2 == 0;
        let mut len = 0;
        while in_bounds(x, y) && inside(x, y) == want_dark && len <= limit(pattern[ring]) {
            len += 1;
            x -= dx;
            y -= dy;
        }
        if len == 0 || len > limit(pattern[ring]) {
            return None;
        }
        neg[ring] = len;
    }
    // Positive direction through rings half..n-1; the center ring was
    // already entered, start one past the center pixel.
    let mut pos = [0i32; 16];
    let (mut x, mut y) = (x0 + dx, y0 + dy);
    for ring in half..n {
        let want_dark = (ring - half) % 2 == 0;
        let mut len = 0;
        while in_bounds(x, y) && inside(x, y) == want_dark && len <= limit(pattern[ring]) {
            len += 1;
            x += dx;
            y += dy;
        }
        if (len == 0 && ring != half) || len > limit(pattern[ring]) {
            return None;
        }
        pos[ring] = len;
    }

    let mut window = [(0usize, 0usize); 16];
    for (i, slot) in window.iter_mut().enumerate().take(n) {
        let len = match i.cmp(&half) {
            std::cmp::Ordering::Less => neg[i],
            std::cmp::Ordering::Equal => neg[i] + pos[i],
            std::cmp::Ordering::Greater => pos[i],
        };
        *slot = (0, len as usize);
    }
    let axis_module = match_ratios(&window[..n], pattern)?;

    // Refined center: middle of the center run along this axis.
    let center_shift = (pos[half] - neg[half] + 1) as f32 / 2.0;
    let rx = cx + center_shift * dx as f32;
    let ry = cy + center_shift * dy as f32;
    Some((rx, ry, axis_module))
}

/// All four axes through the candidate; at least three must agree.
fn verify_center(
    matrix: &BitMatrix,
    cx: f32,
    cy: f32,
    pattern: &[u16],
    module: f32,
) -> Option<FinderPattern> {
    let (vx, vy, vmod) = cross_check(matrix, cx, cy, 0, 1, pattern, module)?;
    let (hx, hy, hmod) = cross_check(matrix, vx, vy, 1, 0, pattern, module)?;
    let mut agreeing = 2;
    let mut module_sum = vmod + hmod;
    for (dx, dy) in [(1, 1), (1, -1)] {
        if let Some((_, _, dmod)) = cross_check(matrix, hx, hy, dx, dy, pattern, module) {
            agreeing += 1;
            module_sum += dmod;
        }
    }
    if agreeing < 3 {
        return None;
    }
    Some(FinderPattern {
        x: hx,
        y: hy,
        module_size: module_sum / agreeing as f32,
        count: 1,
    })
}

fn merge_candidate(found: &mut Vec<FinderPattern>, candidate: FinderPattern) {
    let pattern_radius = candidate.module_size * 3.5;
    for existing in found.iter_mut() {
        let dx = existing.x - candidate.x;
        let dy = existing.y - candidate.y;
        let close = (dx * dx + dy * dy).sqrt() < pattern_radius;
        let similar = {
            let ratio = existing.module_size / candidate.module_size;
            (0.5..2.0).contains(&ratio)
        };
        if close && similar {
            existing.combine(candidate.x, candidate.y, candidate.module_size);
            return;
        }
    }
    found.push(candidate);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Paint a square concentric pattern (ring weights out from center)
    /// at the given top-left with the given module size.
    fn paint_square_pattern(m: &mut BitMatrix, left: usize, top: usize, module: usize) {
        // 7x7 modules of a QR finder: dark border, light ring, 3x3 core.
        for my in 0..7 {
            for mx in 0..7 {
                let dark = !(1..6).contains(&mx) || !(1..6).contains(&my)
                    || ((2..5).contains(&mx) && (2..5).contains(&my));
                for py in 0..module {
                    for px in 0..module {
                        m.set(left + mx * module + px, top + my * module + py, dark);
                    }
                }
            }
        }
    }

    #[test]
    fn test_finds_single_qr_finder() {
        let mut m = BitMatrix::new(64, 64);
        paint_square_pattern(&mut m, 10, 12, 4);
        let found = find_concentric_patterns(&m, &[1, 1, 3, 1, 1], true);
        assert_eq!(found.len(), 1);
        let p = &found[0];
        assert!((p.x - 24.0).abs() < 2.0, "x = {}", p.x);
        assert!((p.y - 26.0).abs() < 2.0, "y = {}", p.y);
        assert!((p.module_size - 4.0).abs() < 1.0);
        assert!(p.count >= 3);
    }

    #[test]
    fn test_finds_three_separated_centers() {
        let mut m = BitMatrix::new(120, 120);
        paint_square_pattern(&mut m, 4, 4, 3);
        paint_square_pattern(&mut m, 90, 4, 3);
        paint_square_pattern(&mut m, 4, 90, 3);
        let found = find_concentric_patterns(&m, &[1, 1, 3, 1, 1], true);
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_rejects_wrong_ratios() {
        let mut m = BitMatrix::new(64, 64);
        // Solid dark square: runs can't satisfy 1:1:3:1:1.
        for y in 10..40 {
            for x in 10..40 {
                m.set(x, y, true);
            }
        }
        let found = find_concentric_patterns(&m, &[1, 1, 3, 1, 1], true);
        assert!(found.is_empty());
    }
}
