//! Pointer-driven move/resize/rename state machine.
//!
//! ```text
//! Idle --down on handle--> Active{ResizeStart|ResizeEnd}
//! Idle --down on body----> PendingMove --|dx| >= threshold--> Active{Move}
//! Active | PendingMove --up / cancel--> Idle      (last applied delta stands)
//! Idle --double click----> Editing --commit / cancel--> Idle
//! ```
//!
//! Exactly one session exists at a time. Input listeners are acquired when a
//! session opens and released by a single teardown path on every exit,
//! including dropping the controller mid-drag.

use chrono::NaiveDate;
use tracing::{debug, info};

use super::date;
use super::item::{Item, ItemId, ItemStore};
use super::viewport::TimelineViewport;

/// What a drag changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    ResizeStart,
    ResizeEnd,
    Move,
}

/// The part of a bar that received a pointer press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    StartHandle,
    EndHandle,
    Body,
}

/// Identity of the pointer that opened a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PointerId(pub u64);

/// Keys that end inline editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Enter,
    Escape,
}

/// A live move or resize gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub kind: DragKind,
    pub item_id: ItemId,
    pub pointer: PointerId,
    /// Screen x where the pointer went down.
    pub origin_x: f32,
    pub original_start: NaiveDate,
    pub original_end: NaiveDate,
    pub last_applied_delta_days: i64,
}

impl DragSession {
    fn open(kind: DragKind, pointer: PointerId, item: &Item, origin_x: f32) -> Self {
        Self {
            kind,
            item_id: item.id,
            pointer,
            origin_x,
            original_start: item.start,
            original_end: item.end,
            last_applied_delta_days: 0,
        }
    }

    fn travel(&self, x: f32) -> f32 {
        x - self.origin_x
    }

    /// The replacement for `current` after shifting by `delta_days`.
    pub fn propose(&self, current: &Item, delta_days: i64) -> Item {
        let mut next = current.clone();
        match self.kind {
            DragKind::ResizeStart => {
                let start = date::add_days(self.original_start, delta_days);
                next.start = start.min(self.original_end);
            }
            DragKind::ResizeEnd => {
                let end = date::add_days(self.original_end, delta_days);
                next.end = end.max(self.original_start);
            }
            DragKind::Move => {
                next.start = date::add_days(self.original_start, delta_days);
                next.end = date::add_days(self.original_end, delta_days);
            }
        }
        next
    }
}

/// Inline rename in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub item_id: ItemId,
    pub draft: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    PendingMove(DragSession),
    Active(DragSession),
    Editing(EditSession),
}

/// Host hooks held for the lifetime of a session.
pub trait InputCapture {
    /// Start delivering pointer move/release events to the controller.
    fn attach(&mut self);
    /// Stop delivering pointer move/release events.
    fn detach(&mut self);
    /// Toggle suppression of text selection while a bar is dragged.
    fn suppress_selection(&mut self, _suppressed: bool) {}
}

/// Capture for hosts that always route input to the controller.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCapture;

impl InputCapture for NoCapture {
    fn attach(&mut self) {}
    fn detach(&mut self) {}
}

pub struct DragController<C: InputCapture = NoCapture> {
    state: DragState,
    move_threshold_px: f32,
    capture: C,
    attached: bool,
    selection_suppressed: bool,
}

impl DragController<NoCapture> {
    pub fn new(move_threshold_px: f32) -> Self {
        Self::with_capture(move_threshold_px, NoCapture)
    }
}

impl<C: InputCapture> DragController<C> {
    pub fn with_capture(move_threshold_px: f32, capture: C) -> Self {
        Self {
            state: DragState::Idle,
            move_threshold_px,
            capture,
            attached: false,
            selection_suppressed: false,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, DragState::Idle)
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    /// The move/resize session, pending or active.
    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            DragState::PendingMove(session) | DragState::Active(session) => Some(session),
            _ => None,
        }
    }

    pub fn active_kind(&self) -> Option<DragKind> {
        match &self.state {
            DragState::Active(session) => Some(session.kind),
            _ => None,
        }
    }

    pub fn editing_item(&self) -> Option<ItemId> {
        match &self.state {
            DragState::Editing(edit) => Some(edit.item_id),
            _ => None,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut String> {
        match &mut self.state {
            DragState::Editing(edit) => Some(&mut edit.draft),
            _ => None,
        }
    }

    /// Press on `target` of `item`. Returns false when ignored because a
    /// session or edit is already open.
    pub fn pointer_down(&mut self, pointer: PointerId, target: PointerTarget, item: &Item, x: f32) -> bool {
        if !self.is_idle() {
            debug!(item = %item.id, ?target, "pointer down ignored, controller busy");
            return false;
        }

        self.acquire();
        self.state = match target {
            PointerTarget::StartHandle => {
                self.set_selection_suppressed(true);
                DragState::Active(DragSession::open(DragKind::ResizeStart, pointer, item, x))
            }
            PointerTarget::EndHandle => {
                self.set_selection_suppressed(true);
                DragState::Active(DragSession::open(DragKind::ResizeEnd, pointer, item, x))
            }
            PointerTarget::Body => DragState::PendingMove(DragSession::open(DragKind::Move, pointer, item, x)),
        };
        debug!(item = %item.id, ?target, "drag session opened");
        true
    }

    /// Pointer moved to screen `x`. Returns the replacement handed to the
    /// store, if the whole-day delta changed and the item still exists.
    pub fn pointer_move<S: ItemStore>(
        &mut self,
        pointer: PointerId,
        x: f32,
        viewport: &TimelineViewport,
        store: &mut S,
    ) -> Option<Item> {
        if let DragState::PendingMove(session) = &self.state {
            if session.pointer != pointer || session.travel(x).abs() < self.move_threshold_px {
                return None;
            }
            let session = session.clone();
            debug!(item = %session.item_id, "pending move promoted to drag");
            self.state = DragState::Active(session);
            self.set_selection_suppressed(true);
        }

        let DragState::Active(session) = &mut self.state else {
            return None;
        };
        if session.pointer != pointer {
            return None;
        }

        let delta_days = viewport.day_delta_for(session.travel(x));
        if delta_days == session.last_applied_delta_days {
            return None;
        }
        session.last_applied_delta_days = delta_days;

        let Some(current) = store.item(session.item_id) else {
            debug!(item = %session.item_id, "dragged item is gone, skipping update");
            return None;
        };
        let updated = session.propose(current, delta_days);
        if !store.replace_item(updated.clone()) {
            return None;
        }
        info!(
            item = %updated.id,
            kind = ?session.kind,
            delta_days,
            start = %updated.start,
            end = %updated.end,
            "item dragged"
        );
        Some(updated)
    }

    /// Pointer released. The last applied change is kept.
    pub fn pointer_up(&mut self, pointer: PointerId) -> bool {
        match self.session() {
            Some(session) if session.pointer == pointer => {
                self.end_session("released");
                true
            }
            _ => false,
        }
    }

    /// Pointer capture or window focus was lost mid-gesture.
    pub fn cancel(&mut self) {
        if self.session().is_some() {
            self.end_session("interrupted");
        }
    }

    /// Double click on a bar body starts an inline rename.
    pub fn double_click(&mut self, item: &Item) -> bool {
        if !self.is_idle() {
            return false;
        }
        debug!(item = %item.id, "rename started");
        self.state = DragState::Editing(EditSession {
            item_id: item.id,
            draft: item.name.clone(),
        });
        true
    }

    pub fn key<S: ItemStore>(&mut self, key: EditKey, store: &mut S) -> Option<Item> {
        match key {
            EditKey::Enter => self.commit_edit(store),
            EditKey::Escape => {
                self.cancel_edit();
                None
            }
        }
    }

    /// The rename field lost focus; blur commits.
    pub fn blur<S: ItemStore>(&mut self, store: &mut S) -> Option<Item> {
        self.commit_edit(store)
    }

    pub fn cancel_edit(&mut self) {
        if let DragState::Editing(edit) = &self.state {
            debug!(item = %edit.item_id, "rename cancelled");
            self.state = DragState::Idle;
        }
    }

    fn commit_edit<S: ItemStore>(&mut self, store: &mut S) -> Option<Item> {
        let DragState::Editing(edit) = std::mem::take(&mut self.state) else {
            return None;
        };

        let name = edit.draft.trim();
        let current = store.item(edit.item_id)?;
        if name.is_empty() || name == current.name {
            debug!(item = %edit.item_id, "rename left unchanged");
            return None;
        }

        let mut renamed = current.clone();
        renamed.name = name.to_string();
        if !store.replace_item(renamed.clone()) {
            return None;
        }
        info!(item = %renamed.id, name = %renamed.name, "item renamed");
        Some(renamed)
    }

    fn acquire(&mut self) {
        if !self.attached {
            self.capture.attach();
            self.attached = true;
        }
    }

    fn set_selection_suppressed(&mut self, suppressed: bool) {
        if self.selection_suppressed != suppressed {
            self.capture.suppress_selection(suppressed);
            self.selection_suppressed = suppressed;
        }
    }

    /// Single exit path for move/resize sessions.
    fn end_session(&mut self, reason: &'static str) {
        if let Some(session) = self.session() {
            debug!(item = %session.item_id, kind = ?session.kind, reason, "drag session closed");
        }
        self.state = DragState::Idle;
        self.set_selection_suppressed(false);
        if self.attached {
            self.capture.detach();
            self.attached = false;
        }
    }
}

impl<C: InputCapture> Drop for DragController<C> {
    fn drop(&mut self) {
        if self.attached || self.selection_suppressed {
            self.end_session("dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::TimelineConfig;
    use crate::model::date::parse_ymd;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::cell::RefCell;
    use std::rc::Rc;

    const PPD: f32 = 70.0;
    const MOUSE: PointerId = PointerId(1);

    #[derive(Debug, Default)]
    struct Counts {
        attached: i32,
        detached: i32,
        suppressed: bool,
    }

    #[derive(Clone, Default)]
    struct RecordingCapture(Rc<RefCell<Counts>>);

    impl InputCapture for RecordingCapture {
        fn attach(&mut self) {
            self.0.borrow_mut().attached += 1;
        }
        fn detach(&mut self) {
            self.0.borrow_mut().detached += 1;
        }
        fn suppress_selection(&mut self, suppressed: bool) {
            self.0.borrow_mut().suppressed = suppressed;
        }
    }

    fn d(s: &str) -> NaiveDate {
        parse_ymd(s).unwrap()
    }

    fn viewport() -> TimelineViewport {
        let mut vp = TimelineViewport::new(d("2024-01-01"), d("2024-01-31"), &TimelineConfig::default());
        vp.set_pixels_per_day(PPD);
        vp
    }

    fn store() -> Vec<Item> {
        vec![Item::with_id(ItemId::from_u128(1), "A", d("2024-01-01"), d("2024-01-03"))]
    }

    #[test]
    fn move_preserves_span() {
        let vp = viewport();
        let mut items = store();
        let mut ctl = DragController::new(4.0);
        let item = items[0].clone();

        assert!(ctl.pointer_down(MOUSE, PointerTarget::Body, &item, 300.0));
        assert!(matches!(ctl.state(), DragState::PendingMove(_)));

        let updated = ctl.pointer_move(MOUSE, 300.0 + 2.0 * PPD, &vp, &mut items).unwrap();
        assert_eq!(updated.start, d("2024-01-03"));
        assert_eq!(updated.end, d("2024-01-05"));
        assert_eq!(items[0], updated);
        assert_eq!(ctl.active_kind(), Some(DragKind::Move));

        assert!(ctl.pointer_up(MOUSE));
        assert!(ctl.is_idle());
        assert_eq!(items[0].start, d("2024-01-03"));
    }

    #[test]
    fn small_travel_stays_pending() {
        let vp = viewport();
        let mut items = store();
        let mut ctl = DragController::new(4.0);
        let item = items[0].clone();

        ctl.pointer_down(MOUSE, PointerTarget::Body, &item, 300.0);
        assert_eq!(ctl.pointer_move(MOUSE, 303.0, &vp, &mut items), None);
        assert!(matches!(ctl.state(), DragState::PendingMove(_)));
        // promoted, but still under half a day
        assert_eq!(ctl.pointer_move(MOUSE, 305.0, &vp, &mut items), None);
        assert_eq!(ctl.active_kind(), Some(DragKind::Move));
    }

    #[test]
    fn moves_within_the_same_day_are_coalesced() {
        let vp = viewport();
        let mut items = store();
        let mut ctl = DragController::new(4.0);
        let item = items[0].clone();

        ctl.pointer_down(MOUSE, PointerTarget::EndHandle, &item, 100.0);
        assert!(ctl.pointer_move(MOUSE, 100.0 + PPD, &vp, &mut items).is_some());
        assert_eq!(ctl.pointer_move(MOUSE, 100.0 + PPD + 10.0, &vp, &mut items), None);
        assert_eq!(ctl.pointer_move(MOUSE, 100.0 + PPD - 10.0, &vp, &mut items), None);
        let back = ctl.pointer_move(MOUSE, 100.0, &vp, &mut items).unwrap();
        assert_eq!(back.end, d("2024-01-03"));
    }

    #[rstest]
    #[case(PointerTarget::StartHandle, -2, "2023-12-30", "2024-01-03")]
    #[case(PointerTarget::StartHandle, 1, "2024-01-02", "2024-01-03")]
    #[case(PointerTarget::StartHandle, 9, "2024-01-03", "2024-01-03")]
    #[case(PointerTarget::EndHandle, 4, "2024-01-01", "2024-01-07")]
    #[case(PointerTarget::EndHandle, -9, "2024-01-01", "2024-01-01")]
    fn resize_clamps_to_opposite_edge(
        #[case] target: PointerTarget,
        #[case] days: i64,
        #[case] start: &str,
        #[case] end: &str,
    ) {
        let vp = viewport();
        let mut items = store();
        let mut ctl = DragController::new(4.0);
        let item = items[0].clone();

        ctl.pointer_down(MOUSE, target, &item, 500.0);
        ctl.pointer_move(MOUSE, 500.0 + days as f32 * PPD, &vp, &mut items);
        assert_eq!((items[0].start, items[0].end), (d(start), d(end)));
    }

    #[test]
    fn second_press_is_ignored_while_dragging() {
        let vp = viewport();
        let mut items = store();
        items.push(Item::with_id(ItemId::from_u128(2), "B", d("2024-01-10"), d("2024-01-12")));
        let mut ctl = DragController::new(4.0);
        let (a, b) = (items[0].clone(), items[1].clone());

        assert!(ctl.pointer_down(MOUSE, PointerTarget::StartHandle, &a, 0.0));
        assert!(!ctl.pointer_down(PointerId(2), PointerTarget::Body, &b, 0.0));
        // foreign pointer cannot drive or end the session
        assert_eq!(ctl.pointer_move(PointerId(2), PPD, &vp, &mut items), None);
        assert!(!ctl.pointer_up(PointerId(2)));
        assert_eq!(ctl.session().map(|s| s.item_id), Some(a.id));
    }

    #[test]
    fn removed_item_makes_drag_a_no_op() {
        let vp = viewport();
        let mut items = store();
        let mut ctl = DragController::new(4.0);
        let item = items[0].clone();

        ctl.pointer_down(MOUSE, PointerTarget::StartHandle, &item, 0.0);
        items.clear();
        assert_eq!(ctl.pointer_move(MOUSE, 3.0 * PPD, &vp, &mut items), None);
        assert!(ctl.pointer_up(MOUSE));
    }

    #[test]
    fn capture_is_released_on_every_exit() {
        let vp = viewport();
        let mut items = store();
        let capture = RecordingCapture::default();
        let counts = capture.0.clone();
        let item = items[0].clone();

        let mut ctl = DragController::with_capture(4.0, capture);
        ctl.pointer_down(MOUSE, PointerTarget::Body, &item, 0.0);
        assert!(!counts.borrow().suppressed, "pending moves keep selection");
        ctl.pointer_move(MOUSE, PPD, &vp, &mut items);
        assert!(counts.borrow().suppressed);
        ctl.pointer_up(MOUSE);
        assert!(!counts.borrow().suppressed);

        ctl.pointer_down(MOUSE, PointerTarget::EndHandle, &item, 0.0);
        ctl.cancel();
        assert!(ctl.is_idle());

        ctl.pointer_down(MOUSE, PointerTarget::StartHandle, &item, 0.0);
        drop(ctl);

        let counts = counts.borrow();
        assert_eq!(counts.attached, 3);
        assert_eq!(counts.detached, 3);
        assert!(!counts.suppressed);
    }

    #[test]
    fn rename_commits_trimmed_changed_draft() {
        let mut items = store();
        let mut ctl = DragController::new(4.0);
        let item = items[0].clone();

        assert!(ctl.double_click(&item));
        assert_eq!(ctl.editing_item(), Some(item.id));
        *ctl.draft_mut().unwrap() = "  Launch  ".to_string();
        let renamed = ctl.key(EditKey::Enter, &mut items).unwrap();
        assert_eq!(renamed.name, "Launch");
        assert_eq!(items[0].name, "Launch");
        assert!(ctl.is_idle());
    }

    #[rstest]
    #[case("   ")]
    #[case("A")]
    #[case(" A ")]
    fn rename_without_change_is_dropped(#[case] draft: &str) {
        let mut items = store();
        let mut ctl = DragController::new(4.0);
        let item = items[0].clone();

        ctl.double_click(&item);
        *ctl.draft_mut().unwrap() = draft.to_string();
        assert_eq!(ctl.blur(&mut items), None);
        assert_eq!(items[0].name, "A");
        assert!(ctl.is_idle());
    }

    #[test]
    fn escape_discards_draft() {
        let mut items = store();
        let mut ctl = DragController::new(4.0);
        let item = items[0].clone();

        ctl.double_click(&item);
        *ctl.draft_mut().unwrap() = "Other".to_string();
        assert_eq!(ctl.key(EditKey::Escape, &mut items), None);
        assert_eq!(items[0].name, "A");
        assert!(ctl.is_idle());
    }

    #[test]
    fn editing_blocks_drags_and_second_edit() {
        let mut items = store();
        let mut ctl = DragController::new(4.0);
        let item = items[0].clone();

        ctl.double_click(&item);
        assert!(!ctl.double_click(&item));
        assert!(!ctl.pointer_down(MOUSE, PointerTarget::Body, &item, 0.0));
        ctl.cancel();
        assert_eq!(ctl.editing_item(), Some(item.id));
        ctl.blur(&mut items);
        assert!(ctl.is_idle());
    }

    proptest! {
        #[test]
        fn resize_never_inverts_item(travel in -5000.0f32..5000.0, from_start in any::<bool>()) {
            let vp = viewport();
            let mut items = store();
            let mut ctl = DragController::new(4.0);
            let item = items[0].clone();
            let target = if from_start { PointerTarget::StartHandle } else { PointerTarget::EndHandle };

            ctl.pointer_down(MOUSE, target, &item, 0.0);
            ctl.pointer_move(MOUSE, travel, &vp, &mut items);
            prop_assert!(items[0].start <= items[0].end);
        }
    }
}
