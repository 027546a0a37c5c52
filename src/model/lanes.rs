//! Greedy interval partitioning of items into the fewest non-overlapping lanes.
//!
//! Items are sorted by `(start, end, input index)` and each one goes into the
//! first lane whose watermark (latest adjusted end already placed there) plus
//! `gap_days` is not after the item's start. A new lane is opened when none
//! qualifies. The lane count equals the maximum number of items active at any
//! instant, which is optimal for this packing model.
//!
//! The scan over lanes is linear, so the worst case is O(n·L). Keeping the
//! watermarks in a min-heap would bring this to O(n log n) for large inputs,
//! at the cost of no longer preferring the lowest-index free lane.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::date;
use super::item::{Item, ItemRecord};
use crate::error::{Result, TimelineError};

/// Packing knobs. Both default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneOptions {
    /// Minimum day spacing between consecutive items in one lane.
    pub gap_days: u32,
    /// Minimum occupied duration used for packing only.
    pub min_span_days: u32,
}

/// An item tagged with the lane it was placed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedItem {
    pub item: Item,
    pub lane: usize,
}

/// Place every item into a lane. Items keep their own start/end; the
/// span adjustment only affects watermark bookkeeping.
pub fn assign(items: &[Item], options: LaneOptions) -> Vec<PlacedItem> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| (items[i].start, items[i].end, i));

    let gap = i64::from(options.gap_days);
    let mut watermarks: Vec<NaiveDate> = Vec::new();
    let mut placed = Vec::with_capacity(items.len());

    for i in order {
        let item = &items[i];
        let adjusted_end = item
            .end
            .max(date::add_days(item.start, i64::from(options.min_span_days)));

        let lane = watermarks
            .iter()
            .position(|&mark| date::add_days(mark, gap) <= item.start)
            .unwrap_or(watermarks.len());
        if lane == watermarks.len() {
            watermarks.push(adjusted_end);
        } else {
            watermarks[lane] = adjusted_end;
        }

        placed.push(PlacedItem {
            item: item.clone(),
            lane,
        });
    }

    placed
}

/// Parse wire records and place them. Fails on the first malformed date or
/// a repeated id.
pub fn assign_records(records: Vec<ItemRecord>, options: LaneOptions) -> Result<Vec<PlacedItem>> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut items = Vec::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id) {
            return Err(TimelineError::DuplicateId(record.id.to_string()));
        }
        items.push(Item::try_from(record)?);
    }
    Ok(assign(&items, options))
}

/// Lanes as ordered groups, the canonical shape handed to renderers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaneSet {
    lanes: Vec<Vec<Item>>,
}

impl LaneSet {
    /// Bucket placed items by lane index. Within a lane, items keep the
    /// order they were placed in.
    pub fn from_placed(placed: impl IntoIterator<Item = PlacedItem>) -> Self {
        let mut lanes: Vec<Vec<Item>> = Vec::new();
        for PlacedItem { item, lane } in placed {
            if lanes.len() <= lane {
                lanes.resize_with(lane + 1, Vec::new);
            }
            lanes[lane].push(item);
        }
        lanes.retain(|lane| !lane.is_empty());
        Self { lanes }
    }

    /// Accept lanes that a collaborator already grouped.
    pub fn from_groups(lanes: Vec<Vec<Item>>) -> Self {
        Self::from_placed(
            lanes
                .into_iter()
                .enumerate()
                .flat_map(|(lane, items)| items.into_iter().map(move |item| PlacedItem { item, lane })),
        )
    }

    /// Flatten back into items tagged with their lane index.
    pub fn into_placed(self) -> Vec<PlacedItem> {
        self.lanes
            .into_iter()
            .enumerate()
            .flat_map(|(lane, items)| items.into_iter().map(move |item| PlacedItem { item, lane }))
            .collect()
    }

    pub fn lanes(&self) -> &[Vec<Item>] {
        &self.lanes
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Lane index currently holding `id`, if any.
    pub fn lane_of(&self, id: super::ItemId) -> Option<usize> {
        self.lanes
            .iter()
            .position(|lane| lane.iter().any(|item| item.id == id))
    }
}

/// Lane layout for the presentation layer.
pub struct LaneLayout;

impl LaneLayout {
    pub fn compute(items: &[Item], options: LaneOptions) -> LaneSet {
        LaneSet::from_placed(assign(items, options))
    }

    /// Fail-soft variant for raw host input: a bad record degrades to an
    /// empty layout and the cause is logged.
    pub fn compute_or_empty(records: Vec<ItemRecord>, options: LaneOptions) -> LaneSet {
        match assign_records(records, options) {
            Ok(placed) => LaneSet::from_placed(placed),
            Err(err) => {
                warn!(error = %err, "lane assignment failed, rendering no lanes");
                LaneSet::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::date::parse_ymd;
    use crate::model::ItemId;
    use proptest::prelude::*;

    fn item(id: u128, start: &str, end: &str) -> Item {
        Item::with_id(
            ItemId::from_u128(id),
            format!("item {id}"),
            parse_ymd(start).unwrap(),
            parse_ymd(end).unwrap(),
        )
    }

    fn lane_of(placed: &[PlacedItem], id: u128) -> usize {
        placed
            .iter()
            .find(|p| p.item.id == ItemId::from_u128(id))
            .map(|p| p.lane)
            .unwrap()
    }

    #[test]
    fn empty_input_gives_no_lanes() {
        assert!(assign(&[], LaneOptions::default()).is_empty());
        assert!(LaneLayout::compute(&[], LaneOptions::default()).is_empty());
    }

    #[test]
    fn packs_the_reference_scenario() {
        let items = vec![
            item(1, "2024-01-01", "2024-01-03"),
            item(2, "2024-01-02", "2024-01-04"),
            item(3, "2024-01-05", "2024-01-06"),
        ];
        let placed = assign(&items, LaneOptions::default());
        assert_eq!(lane_of(&placed, 1), 0);
        assert_eq!(lane_of(&placed, 2), 1);
        assert_eq!(lane_of(&placed, 3), 0);
    }

    #[test]
    fn touching_items_share_a_lane_without_gap() {
        let items = vec![
            item(1, "2024-01-01", "2024-01-03"),
            item(2, "2024-01-03", "2024-01-04"),
        ];
        let placed = assign(&items, LaneOptions::default());
        assert_eq!(lane_of(&placed, 2), 0);

        let gapped = assign(
            &items,
            LaneOptions {
                gap_days: 1,
                ..Default::default()
            },
        );
        assert_eq!(lane_of(&gapped, 2), 1);
    }

    #[test]
    fn min_span_only_affects_packing() {
        let items = vec![
            item(1, "2024-01-01", "2024-01-01"),
            item(2, "2024-01-02", "2024-01-02"),
        ];
        let placed = assign(
            &items,
            LaneOptions {
                min_span_days: 3,
                ..Default::default()
            },
        );
        assert_eq!(lane_of(&placed, 2), 1);
        assert_eq!(placed[0].item.end, parse_ymd("2024-01-01").unwrap());
    }

    #[test]
    fn mutually_overlapping_items_get_a_lane_each() {
        let items: Vec<Item> = (0..4).map(|i| item(i, "2024-03-01", "2024-03-10")).collect();
        let placed = assign(&items, LaneOptions::default());
        let lanes: Vec<usize> = placed.iter().map(|p| p.lane).collect();
        assert_eq!(lanes, vec![0, 1, 2, 3]);
        // identical spans fall back to input order
        let ids: Vec<ItemId> = placed.iter().map(|p| p.item.id).collect();
        assert_eq!(ids, items.iter().map(|i| i.id).collect::<Vec<_>>());
    }

    #[test]
    fn lane_shapes_convert_both_ways() {
        let items = vec![
            item(1, "2024-01-01", "2024-01-03"),
            item(2, "2024-01-02", "2024-01-04"),
            item(3, "2024-01-05", "2024-01-06"),
        ];
        let set = LaneLayout::compute(&items, LaneOptions::default());
        assert_eq!(set.len(), 2);
        assert_eq!(set.lanes()[0].len(), 2);
        assert_eq!(set.lane_of(ItemId::from_u128(2)), Some(1));

        let regrouped = LaneSet::from_groups(set.lanes().to_vec());
        assert_eq!(regrouped, set);
        let flat = set.into_placed();
        assert_eq!(LaneSet::from_placed(flat), regrouped);
    }

    #[test]
    fn bad_records_degrade_to_empty_layout() {
        let records = vec![
            ItemRecord::from(&item(1, "2024-01-01", "2024-01-03")),
            ItemRecord {
                id: ItemId::from_u128(2),
                name: "broken".into(),
                start: "2024-13-01".into(),
                end: "2024-01-04".into(),
            },
        ];
        assert!(assign_records(records.clone(), LaneOptions::default()).is_err());
        assert!(LaneLayout::compute_or_empty(records, LaneOptions::default()).is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let a = ItemRecord::from(&item(1, "2024-01-01", "2024-01-03"));
        let err = assign_records(vec![a.clone(), a], LaneOptions::default()).unwrap_err();
        assert!(matches!(err, TimelineError::DuplicateId(_)));
    }

    fn arb_items(min_len: i64) -> impl Strategy<Value = Vec<Item>> {
        prop::collection::vec((0i64..60, min_len..10), 0..40).prop_map(|spans| {
            let base = parse_ymd("2024-01-01").unwrap();
            spans
                .into_iter()
                .enumerate()
                .map(|(i, (offset, len))| {
                    let start = date::add_days(base, offset);
                    Item::with_id(
                        ItemId::from_u128(i as u128),
                        "x",
                        start,
                        date::add_days(start, len),
                    )
                })
                .collect()
        })
    }

    fn adjusted_end(item: &Item, options: LaneOptions) -> NaiveDate {
        item.end
            .max(date::add_days(item.start, i64::from(options.min_span_days)))
    }

    proptest! {
        #[test]
        fn lanes_never_overlap(items in arb_items(0), gap in 0u32..3, min_span in 0u32..4) {
            let options = LaneOptions { gap_days: gap, min_span_days: min_span };
            let set = LaneSet::from_placed(assign(&items, options));
            for lane in set.lanes() {
                for pair in lane.windows(2) {
                    let boundary = date::add_days(adjusted_end(&pair[0], options), i64::from(gap));
                    prop_assert!(pair[1].start >= boundary);
                }
            }
        }

        #[test]
        fn lane_count_matches_peak_overlap(items in arb_items(1)) {
            let options = LaneOptions::default();
            let lanes = LaneSet::from_placed(assign(&items, options)).len();
            // For packing an item occupies [start, end).
            let peak = items
                .iter()
                .map(|probe| {
                    items
                        .iter()
                        .filter(|other| other.start <= probe.start && probe.start < other.end)
                        .count()
                })
                .max()
                .unwrap_or(0);
            prop_assert_eq!(lanes, peak);
        }

        #[test]
        fn assignment_is_deterministic(items in arb_items(0)) {
            let options = LaneOptions { gap_days: 1, min_span_days: 2 };
            prop_assert_eq!(assign(&items, options), assign(&items, options));
        }
    }
}
