//! Lane allocation and on-screen positioning

use crate::config::{LaneLayout, ScreenGeometry};
use crate::render::{Flight, Point, TextExtent};
use danmu_core::{Category, LaneGroup};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// One row and the time from which it is considered free
#[derive(Debug, Clone, Copy)]
struct LaneSlot {
    next_available: f64,
    lane: usize,
}

impl PartialEq for LaneSlot {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LaneSlot {}

impl PartialOrd for LaneSlot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LaneSlot {
    fn cmp(&self, other: &Self) -> Ordering {
        self.next_available
            .total_cmp(&other.next_available)
            .then(self.lane.cmp(&other.lane))
    }
}

/// Min-heap of lane slots. Always holds exactly one slot per lane.
#[derive(Debug, Clone)]
struct LaneHeap {
    heap: BinaryHeap<Reverse<LaneSlot>>,
}

impl LaneHeap {
    fn new(lanes: usize) -> Self {
        let heap = (0..lanes)
            .map(|lane| {
                Reverse(LaneSlot {
                    next_available: 0.0,
                    lane,
                })
            })
            .collect();
        Self { heap }
    }

    /// Takes the lane that frees up first, busy or not, and books it until
    /// `busy_until`
    fn claim(&mut self, busy_until: f64) -> usize {
        let Reverse(slot) = self
            .heap
            .pop()
            .expect("lane heap is seeded with every lane and refilled on each claim");
        self.heap.push(Reverse(LaneSlot {
            next_available: busy_until.max(0.0),
            lane: slot.lane,
        }));
        slot.lane
    }

    fn peek(&self) -> Option<&LaneSlot> {
        self.heap.peek().map(|Reverse(slot)| slot)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// Hands out rows so that simultaneously visible comments rarely overlap.
///
/// This is a least-loaded heuristic, not an exclusion guarantee: when every
/// lane is busy the one that frees up first is reused.
#[derive(Debug, Clone)]
pub struct LaneAllocator {
    scroll: LaneHeap,
    top: LaneHeap,
    bottom: LaneHeap,
    lanes: usize,
    scroll_reuse_fraction: f64,
}

impl LaneAllocator {
    /// Creates an allocator with `lanes` rows per group
    pub fn new(lanes: usize, scroll_reuse_fraction: f64) -> Self {
        assert!(lanes > 0, "a lane group needs at least one lane");
        Self {
            scroll: LaneHeap::new(lanes),
            top: LaneHeap::new(lanes),
            bottom: LaneHeap::new(lanes),
            lanes,
            scroll_reuse_fraction,
        }
    }

    /// Number of lanes in each group
    pub fn lane_count(&self) -> usize {
        self.lanes
    }

    /// Assigns a lane to a comment arriving at `now` that stays on screen for
    /// `duration` seconds.
    ///
    /// A scrolling comment blocks its lane only for the first
    /// `scroll_reuse_fraction` of its flight, since it moves out of the way.
    /// A fixed comment blocks its lane for the whole flight.
    pub fn assign(&mut self, group: LaneGroup, now: f64, duration: f64) -> usize {
        let busy_for = match group {
            LaneGroup::Scroll => duration * self.scroll_reuse_fraction,
            LaneGroup::FixedTop | LaneGroup::FixedBottom => duration,
        };
        let lane = self.heap_mut(group).claim(now + busy_for);
        assert!(lane < self.lanes, "lane {lane} out of range");
        assert_eq!(self.heap(group).len(), self.lanes, "lane heap lost a slot");
        lane
    }

    /// Earliest time any lane of `group` is free
    pub fn next_available(&self, group: LaneGroup) -> f64 {
        self.heap(group).peek().map_or(0.0, |slot| slot.next_available)
    }

    /// Frees every lane
    pub fn reset(&mut self) {
        for group in LaneGroup::ALL {
            *self.heap_mut(group) = LaneHeap::new(self.lanes);
        }
    }

    fn heap(&self, group: LaneGroup) -> &LaneHeap {
        match group {
            LaneGroup::Scroll => &self.scroll,
            LaneGroup::FixedTop => &self.top,
            LaneGroup::FixedBottom => &self.bottom,
        }
    }

    fn heap_mut(&mut self, group: LaneGroup) -> &mut LaneHeap {
        match group {
            LaneGroup::Scroll => &mut self.scroll,
            LaneGroup::FixedTop => &mut self.top,
            LaneGroup::FixedBottom => &mut self.bottom,
        }
    }
}

/// Vertical position of `lane` in `group`, clamped to the usable screen area
pub fn lane_y(layout: &LaneLayout, screen: &ScreenGeometry, group: LaneGroup, lane: usize) -> f64 {
    let y = match group {
        LaneGroup::Scroll | LaneGroup::FixedTop => lane as f64 * layout.row_height + layout.top_margin,
        LaneGroup::FixedBottom => {
            screen.height - layout.bottom_margin - (lane + 1) as f64 * layout.row_height
        }
    };
    let lowest = screen.height - layout.bottom_margin - layout.row_height;
    y.min(lowest).max(0.0)
}

/// Start and end points of a comment's flight
pub fn plan_flight(
    layout: &LaneLayout,
    screen: &ScreenGeometry,
    category: Category,
    lane: usize,
    extent: TextExtent,
    duration_ms: u64,
) -> Flight {
    let y = lane_y(layout, screen, category.lane_group(), lane);
    let (start_x, end_x) = match category {
        Category::ScrollRightToLeft => (screen.width, -extent.width),
        Category::ScrollLeftToRight => (-extent.width, screen.width),
        Category::FixedTop | Category::FixedBottom => {
            let x = (screen.width - extent.width) / 2.0;
            (x, x)
        }
    };

    Flight {
        start: Point::new(start_x, y),
        end: Point::new(end_x, y),
        duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_fresh_lanes_are_taken_in_order() {
        let mut lanes = LaneAllocator::new(4, 0.2);
        let assigned: Vec<usize> = (0..4)
            .map(|_| lanes.assign(LaneGroup::Scroll, 0.0, 10.0))
            .collect();
        assert_eq!(assigned, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_scroll_lane_reused_after_fifth_of_flight() {
        let mut lanes = LaneAllocator::new(3, 0.2);

        assert_eq!(lanes.assign(LaneGroup::Scroll, 0.0, 10.0), 0);
        assert_eq!(lanes.next_available(LaneGroup::Scroll), 0.0);
        assert_eq!(lanes.assign(LaneGroup::Scroll, 1.0, 10.0), 1);
        assert_eq!(lanes.assign(LaneGroup::Scroll, 2.5, 10.0), 2);

        // lane 0 frees at 2.0, lane 1 at 3.0, lane 2 at 4.5
        assert_eq!(lanes.next_available(LaneGroup::Scroll), 2.0);
        assert_eq!(lanes.assign(LaneGroup::Scroll, 3.0, 10.0), 0);
        assert_eq!(lanes.assign(LaneGroup::Scroll, 3.0, 10.0), 1);
    }

    #[test]
    fn test_busy_lanes_are_reused_least_loaded_first() {
        let mut lanes = LaneAllocator::new(2, 0.2);
        lanes.assign(LaneGroup::Scroll, 0.0, 50.0); // lane 0 busy until 10
        lanes.assign(LaneGroup::Scroll, 0.0, 20.0); // lane 1 busy until 4

        // both busy at t=1, lane 1 frees first
        assert_eq!(lanes.assign(LaneGroup::Scroll, 1.0, 5.0), 1);
    }

    #[test]
    fn test_fixed_lanes_block_whole_duration() {
        let mut lanes = LaneAllocator::new(3, 0.2);

        assert_eq!(lanes.assign(LaneGroup::FixedTop, 0.0, 4.0), 0);
        assert_eq!(lanes.assign(LaneGroup::FixedTop, 1.0, 4.0), 1);
        assert_eq!(lanes.assign(LaneGroup::FixedTop, 3.9, 4.0), 2);
        assert_eq!(lanes.next_available(LaneGroup::FixedTop), 4.0);
        assert_eq!(lanes.assign(LaneGroup::FixedTop, 4.0, 4.0), 0);
    }

    #[test]
    fn test_groups_are_independent() {
        let mut lanes = LaneAllocator::new(3, 0.2);
        lanes.assign(LaneGroup::Scroll, 0.0, 8.0);
        lanes.assign(LaneGroup::Scroll, 0.0, 8.0);

        assert_eq!(lanes.assign(LaneGroup::FixedTop, 0.0, 4.0), 0);
        assert_eq!(lanes.assign(LaneGroup::FixedBottom, 0.0, 4.0), 0);
        assert_eq!(lanes.assign(LaneGroup::Scroll, 0.0, 8.0), 2);
    }

    #[test]
    fn test_lane_index_always_in_range() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut lanes = LaneAllocator::new(7, 0.2);
        let mut now = 0.0;

        for _ in 0..5_000 {
            now += rng.gen_range(0.0..0.3);
            let group = LaneGroup::ALL[rng.gen_range(0..3)];
            let lane = lanes.assign(group, now, rng.gen_range(0.5..12.0));
            assert!(lane < lanes.lane_count());
        }
    }

    #[test]
    fn test_reset_frees_all_lanes() {
        let mut lanes = LaneAllocator::new(2, 0.2);
        lanes.assign(LaneGroup::FixedBottom, 10.0, 4.0);
        lanes.assign(LaneGroup::FixedBottom, 10.0, 4.0);
        assert_eq!(lanes.next_available(LaneGroup::FixedBottom), 14.0);

        lanes.reset();
        assert_eq!(lanes.next_available(LaneGroup::FixedBottom), 0.0);
        assert_eq!(lanes.assign(LaneGroup::FixedBottom, 11.0, 4.0), 0);
    }

    #[test]
    fn test_lane_y() {
        let layout = LaneLayout::default();
        let screen = ScreenGeometry::new(1920.0, 1080.0);

        assert_eq!(lane_y(&layout, &screen, LaneGroup::Scroll, 0), 25.0);
        assert_eq!(lane_y(&layout, &screen, LaneGroup::FixedTop, 3), 100.0);
        assert_eq!(lane_y(&layout, &screen, LaneGroup::FixedBottom, 0), 1005.0);
        assert_eq!(lane_y(&layout, &screen, LaneGroup::FixedBottom, 1), 980.0);
        // clamped to the lowest usable row
        assert_eq!(lane_y(&layout, &screen, LaneGroup::Scroll, 45), 1005.0);
        // clamped at the top
        assert_eq!(lane_y(&layout, &screen, LaneGroup::FixedBottom, 60), 0.0);
    }

    #[test]
    fn test_plan_flight() {
        let layout = LaneLayout::default();
        let screen = ScreenGeometry::new(1000.0, 600.0);
        let extent = TextExtent {
            width: 120.0,
            height: 30.0,
        };

        let r2l = plan_flight(&layout, &screen, Category::ScrollRightToLeft, 2, extent, 8000);
        assert_eq!(r2l.start, Point::new(1000.0, 75.0));
        assert_eq!(r2l.end, Point::new(-120.0, 75.0));
        assert_eq!(r2l.duration_ms, 8000);

        let l2r = plan_flight(&layout, &screen, Category::ScrollLeftToRight, 0, extent, 8000);
        assert_eq!(l2r.start.x, -120.0);
        assert_eq!(l2r.end.x, 1000.0);

        let top = plan_flight(&layout, &screen, Category::FixedTop, 0, extent, 4000);
        assert_eq!(top.start, top.end);
        assert_eq!(top.start.x, 440.0);
    }
}
