//! Nearest-match selection for filter tables.

/// Index of the entry closest to `want`. Ties go to the lower index.
pub fn closest_index(table: &[u32], want: u32) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (i, entry) in table.iter().enumerate() {
        let delta = entry.abs_diff(want);
        match best {
            Some((_, best_delta)) if delta >= best_delta => {}
            _ => best = Some((i, delta)),
        }
    }
    best.map(|(i, _)| i)
}

/// A selected filter entry and the bandwidth it provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandwidthPlan {
    pub requested: u32,
    pub index: usize,
    pub achieved: u32,
}

impl BandwidthPlan {
    pub fn select(table: &[u32], requested: u32) -> Option<BandwidthPlan> {
        closest_index(table, requested).map(|index| BandwidthPlan {
            requested,
            index,
            achieved: table[index],
        })
    }
}
