//! Per-slide keep/delete planning.
//!
//! `plan_slide` turns the item listing of one slide into the edits the host
//! must apply. It never talks to Keynote itself, so the whole decision table
//! is testable without a running application.

use serde::Deserialize;

use crate::fonts::FontAllowList;

// ---------------------------------------------------------------------------
// Slide items
// ---------------------------------------------------------------------------

/// The item collections whose members are classified one by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    TextItem,
    Shape,
}

/// The slide's layout placeholders. These can be hidden but not deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    Title,
    Body,
}

/// Collections removed wholesale from the text copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemClass {
    Charts,
    Images,
    Groups,
    Lines,
    Tables,
}

impl ItemClass {
    pub const ALL: [ItemClass; 5] = [
        ItemClass::Charts,
        ItemClass::Images,
        ItemClass::Groups,
        ItemClass::Lines,
        ItemClass::Tables,
    ];
}

/// One text item or shape as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SlideItem {
    pub kind: ItemKind,
    /// 0-based position within its `kind` collection.
    pub index: usize,
    /// PostScript font name of the item's text, if any.
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub placeholder: Option<Placeholder>,
}

/// Addresses a single item for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub index: usize,
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Which half of the deck a copy keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupMode {
    /// Text copy: keep safe text, drop everything else.
    KeepSafeText,
    /// Vector copy: drop safe text, keep everything else.
    DropSafeText,
}

impl CleanupMode {
    pub fn keeps_safe_text(self) -> bool {
        self == CleanupMode::KeepSafeText
    }
}

/// Edits to apply to one slide, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlidePlan {
    pub hide_title: bool,
    pub hide_body: bool,
    /// Text items first, then shapes; descending index within each kind.
    pub delete: Vec<ItemRef>,
    pub delete_all: Vec<ItemClass>,
    pub locked_skipped: usize,
}

impl SlidePlan {
    pub fn is_empty(&self) -> bool {
        !self.hide_title && !self.hide_body && self.delete.is_empty() && self.delete_all.is_empty()
    }
}

/// Decides what has to go from a slide.
///
/// An item goes when its safety differs from what `mode` keeps. Placeholders
/// that go are hidden instead of deleted, and locked items are left alone.
pub fn plan_slide(items: &[SlideItem], mode: CleanupMode, fonts: &FontAllowList) -> SlidePlan {
    let mut plan = SlidePlan::default();

    for kind in [ItemKind::TextItem, ItemKind::Shape] {
        let mut doomed: Vec<usize> = Vec::new();

        for item in items.iter().filter(|i| i.kind == kind) {
            let safe = fonts.is_safe_opt(item.font.as_deref());
            if safe == mode.keeps_safe_text() {
                continue;
            }
            match item.placeholder {
                Some(Placeholder::Title) => plan.hide_title = true,
                Some(Placeholder::Body) => plan.hide_body = true,
                None if item.locked => {
                    log::debug!("cleanup: {:?} {} is locked, keeping it", kind, item.index);
                    plan.locked_skipped += 1;
                }
                None => doomed.push(item.index),
            }
        }

        doomed.sort_unstable_by(|a, b| b.cmp(a));
        doomed.dedup();
        let refs = doomed.into_iter().map(|index| ItemRef { kind, index });
        plan.delete.extend(refs);
    }

    if mode.keeps_safe_text() {
        plan.delete_all.extend(ItemClass::ALL);
    }

    plan
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
