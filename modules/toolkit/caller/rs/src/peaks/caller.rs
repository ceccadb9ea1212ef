use diffpeak_core_rs::loc::IntervalOp;
use log::debug;

use super::Peak;
use crate::window::WindowList;

/// Merge runs of windows with the final combined p-value at or below `cutoff`.
pub fn narrow(windows: &WindowList, cutoff: f64) -> Vec<Peak> {
    let mut peaks = Vec::new();
    let mut current: Option<Peak> = None;
    for window in windows.windows() {
        if window.combined_qvalue() > cutoff {
            continue;
        }
        let peak = Peak::from(window);
        current = match current {
            Some(mut active) if active.is_mergeable(&peak) => {
                active.absorb(&peak);
                Some(active)
            }
            Some(active) => {
                peaks.push(active);
                Some(peak)
            }
            None => Some(peak),
        };
    }
    peaks.extend(current);

    debug!("Called {} narrow peaks", peaks.len());
    peaks
}

/// Merge narrow peaks on the same chromosome separated by less than two window sizes.
pub fn broad(narrow: &[Peak], window_size: u64) -> Vec<Peak> {
    let distance = 2 * window_size;

    let mut peaks = Vec::new();
    let mut current: Option<Peak> = None;
    for peak in narrow {
        current = match current {
            Some(mut active) if active.contig() == peak.contig() && active.gap(peak) < distance => {
                active.absorb(peak);
                Some(active)
            }
            Some(active) => {
                peaks.push(active);
                Some(peak.clone())
            }
            None => Some(peak.clone()),
        };
    }
    peaks.extend(current);

    debug!("Called {} broad peaks", peaks.len());
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{GenomeMap, Window};
    use diffpeak_core_rs::loc::Interval;
    use eyre::Result;

    fn window(contig: usize, start: u64, end: u64, qvalue: f64) -> Result<Window> {
        let mut window = Window::new(contig, Interval::new(start, end)?, 1);
        window.set_count(0, 1);
        window.set_combined_qvalue(qvalue);
        Ok(window)
    }

    fn genome() -> GenomeMap {
        let mut genome = GenomeMap::new();
        genome.add("chr1", 10_000).add("chr2", 10_000);
        genome
    }

    #[test]
    fn test_adjacent_windows_merge() -> Result<()> {
        let windows = vec![window(0, 0, 200, 1e-7)?, window(0, 50, 250, 1e-6)?];
        let list = WindowList::freeze(&genome(), 1, 100, [windows])?;

        let peaks = narrow(&list, 1e-5);
        assert_eq!(peaks, vec![Peak::new(0, Interval::new(0, 250)?, 1e-7)]);
        Ok(())
    }

    #[test]
    fn test_narrow() -> Result<()> {
        let windows = vec![
            window(0, 0, 200, 1e-3)?,
            window(0, 100, 300, 1e-6)?,
            window(0, 300, 500, 1e-8)?,
            window(0, 600, 800, 1e-6)?,
            window(0, 700, 900, 0.5)?,
            window(1, 800, 1000, 1e-9)?,
        ];
        let list = WindowList::freeze(&genome(), 1, 100, [windows])?;

        let peaks = narrow(&list, 1e-5);
        assert_eq!(
            peaks,
            vec![
                // Touching windows merge
                Peak::new(0, Interval::new(100, 500)?, 1e-8),
                Peak::new(0, Interval::new(600, 800)?, 1e-6),
                // Same coordinates on another chromosome never merge
                Peak::new(1, Interval::new(800, 1000)?, 1e-9),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_broad() -> Result<()> {
        let narrow = vec![
            Peak::new(0, Interval::new(0, 100)?, 1e-6),
            // Gap of 399 < 2 * 200
            Peak::new(0, Interval::new(499, 600)?, 1e-9),
            // Gap of exactly 400 is kept apart
            Peak::new(0, Interval::new(1000, 1100)?, 1e-7),
            Peak::new(1, Interval::new(1100, 1200)?, 1e-7),
        ];
        let peaks = broad(&narrow, 200);
        assert_eq!(
            peaks,
            vec![
                Peak::new(0, Interval::new(0, 600)?, 1e-9),
                Peak::new(0, Interval::new(1000, 1100)?, 1e-7),
                Peak::new(1, Interval::new(1100, 1200)?, 1e-7),
            ]
        );
        assert!(broad(&[], 200).is_empty());
        Ok(())
    }

    #[test]
    fn test_merge_is_order_independent() -> Result<()> {
        let a = Peak::new(0, Interval::new(0, 200)?, 1e-6);
        let b = Peak::new(0, Interval::new(150, 350)?, 1e-8);
        let c = Peak::new(0, Interval::new(350, 400)?, 1e-7);

        let mut left = a.clone();
        left.absorb(&b);
        left.absorb(&c);

        let mut bc = b.clone();
        bc.absorb(&c);
        let mut right = a.clone();
        right.absorb(&bc);

        let mut reversed = c.clone();
        reversed.absorb(&b);
        reversed.absorb(&a);

        assert_eq!(left, right);
        assert_eq!(left, reversed);
        assert_eq!(left, Peak::new(0, Interval::new(0, 400)?, 1e-8));
        Ok(())
    }
}
