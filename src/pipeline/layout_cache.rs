//! Identity-keyed descriptor and size caches.
//!
//! Each pass builds a fresh slot map: an item whose identity was seen last
//! pass *with the same reference* reuses its descriptor and size, anything
//! else is derived. Identities that are no longer visible drop out when the
//! new map replaces the old one.
//!
//! Offsets are accumulated front to back:
//! `offset[0] = 0`, `offset[i] = offset[i-1] + length[i-1] + separator`.

use super::card::{card_size, derive_card, CardDescriptor, CardOptions};
use super::offset_index::OffsetIndex;
use crate::model::error::CardError;
use crate::model::{resolve_identity, Item, ItemKey};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Position and length of one item in the virtualized list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutRecord {
    /// Position of the item in the frame.
    pub index: usize,
    /// Distance from the first item's start.
    pub offset: u64,
    /// Card height, separator excluded.
    pub length: u32,
}

/// Inputs every descriptor and size depends on.
///
/// A change here discards every cached slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutParams {
    /// Width available to card text.
    pub width: u16,
    /// Which parts of a card are shown.
    pub options: CardOptions,
    /// Gap after every card.
    pub separator: u32,
}

/// How a card is described and measured.
pub trait CardLayout {
    /// Derive the descriptor of `item`.
    fn describe(&self, item: &Item, params: &LayoutParams) -> Result<CardDescriptor, CardError>;

    /// Height of a described card.
    fn size(&self, descriptor: &CardDescriptor, params: &LayoutParams) -> u32;
}

/// Cards as produced by [`derive_card`] and measured by [`card_size`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCardLayout;

impl CardLayout for DefaultCardLayout {
    fn describe(&self, item: &Item, params: &LayoutParams) -> Result<CardDescriptor, CardError> {
        derive_card(item, params.options, params.width)
    }

    fn size(&self, descriptor: &CardDescriptor, _params: &LayoutParams) -> u32 {
        card_size(descriptor)
    }
}

#[derive(Debug, Clone)]
struct CacheSlot {
    /// Item reference the slot was derived from.
    token: Arc<Item>,
    /// `None` when derivation failed.
    descriptor: Option<Arc<CardDescriptor>>,
    size: u32,
}

/// Result of one layout pass.
#[derive(Debug, Clone)]
pub struct LayoutPass {
    /// One entry per item; `None` where derivation failed.
    pub descriptors: Arc<[Option<Arc<CardDescriptor>>]>,
    /// One record per item.
    pub records: Arc<[LayoutRecord]>,
    /// Slots derived during this pass.
    pub derived: usize,
    /// Slots reused from the previous pass.
    pub reused: usize,
}

impl LayoutPass {
    fn empty() -> Self {
        Self {
            descriptors: Arc::from(Vec::new()),
            records: Arc::from(Vec::new()),
            derived: 0,
            reused: 0,
        }
    }
}

/// Compute layout records from item lengths.
pub fn layout_records(lengths: &[u32], separator: u32) -> Vec<LayoutRecord> {
    let mut offset = 0u64;
    lengths
        .iter()
        .enumerate()
        .map(|(index, &length)| {
            let record = LayoutRecord {
                index,
                offset,
                length,
            };
            offset += u64::from(length) + u64::from(separator);
            record
        })
        .collect()
}

/// Per-column layout cache.
#[derive(Debug, Default)]
pub struct LayoutCache<L = DefaultCardLayout> {
    layout: L,
    slots: HashMap<ItemKey, CacheSlot>,
    params: Option<LayoutParams>,
    order: Vec<Option<ItemKey>>,
    offsets: OffsetIndex,
}

impl LayoutCache<DefaultCardLayout> {
    /// Cache using [`DefaultCardLayout`].
    pub fn new() -> Self {
        Self::with_layout(DefaultCardLayout)
    }
}

impl<L: CardLayout> LayoutCache<L> {
    /// Cache describing and measuring cards with `layout`.
    pub fn with_layout(layout: L) -> Self {
        Self {
            layout,
            slots: HashMap::new(),
            params: None,
            order: Vec::new(),
            offsets: OffsetIndex::default(),
        }
    }

    /// Drop every cached slot and offset.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.order.clear();
        self.offsets.clear();
    }

    /// Number of cached identities.
    pub fn cached(&self) -> usize {
        self.slots.len()
    }

    /// Index of the item covering `offset`, measured from the first item.
    pub fn index_at_offset(&self, offset: u64) -> Option<usize> {
        self.offsets.index_at_offset(offset)
    }

    /// Total extent of the laid out items, separators included.
    pub fn total_extent(&self) -> u64 {
        self.offsets.total()
    }

    /// Run one layout pass over `items`.
    ///
    /// Never fails: an item whose descriptor cannot be derived gets length 0
    /// (its separator is still counted).
    pub fn derive_layout(&mut self, items: &[Arc<Item>], params: &LayoutParams) -> LayoutPass {
        if self.params.as_ref() != Some(params) {
            if self.params.is_some() {
                debug!(?params, "Layout parameters changed; discarding cached cards");
            }
            self.slots.clear();
            self.params = Some(*params);
        }

        if items.is_empty() {
            self.reset();
            return LayoutPass::empty();
        }

        let mut next: HashMap<ItemKey, CacheSlot> = HashMap::with_capacity(items.len());
        let mut descriptors = Vec::with_capacity(items.len());
        let mut lengths = Vec::with_capacity(items.len());
        let mut order = Vec::with_capacity(items.len());
        let (mut derived, mut reused) = (0, 0);

        for item in items {
            let key = resolve_identity(item);
            let cached = key
                .as_ref()
                .and_then(|k| next.get(k).or_else(|| self.slots.get(k)))
                .filter(|slot| Arc::ptr_eq(&slot.token, item))
                .cloned();

            let slot = match cached {
                Some(slot) => {
                    reused += 1;
                    slot
                }
                None => {
                    derived += 1;
                    self.derive_slot(item, params)
                }
            };

            descriptors.push(slot.descriptor.clone());
            lengths.push(slot.size);
            if let Some(key) = &key {
                next.entry(key.clone()).or_insert(slot);
            }
            order.push(key);
        }

        self.update_offsets(&order, &lengths, params.separator);
        self.slots = next;
        self.order = order;

        debug!(items = items.len(), derived, reused, "Layout pass");
        LayoutPass {
            descriptors: Arc::from(descriptors),
            records: Arc::from(layout_records(&lengths, params.separator)),
            derived,
            reused,
        }
    }

    fn derive_slot(&self, item: &Arc<Item>, params: &LayoutParams) -> CacheSlot {
        match self.layout.describe(item, params) {
            Ok(descriptor) => {
                let size = self.layout.size(&descriptor, params);
                CacheSlot {
                    token: Arc::clone(item),
                    descriptor: Some(Arc::new(descriptor)),
                    size,
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not describe card; laying it out with zero length");
                CacheSlot {
                    token: Arc::clone(item),
                    descriptor: None,
                    size: 0,
                }
            }
        }
    }

    fn update_offsets(&mut self, order: &[Option<ItemKey>], lengths: &[u32], separator: u32) {
        let extents = lengths
            .iter()
            .map(|&length| u64::from(length) + u64::from(separator));

        if order == self.order.as_slice() && self.offsets.len() == lengths.len() {
            for (i, extent) in extents.enumerate() {
                if self.offsets.extent(i) != extent {
                    self.offsets.set(i, extent);
                }
            }
        } else {
            self.offsets = OffsetIndex::from_extents(extents);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::test_support::notification;
    use proptest::prelude::*;

    /// Cards whose height is the number in their title.
    struct TitleHeights;

    impl CardLayout for TitleHeights {
        fn describe(
            &self,
            item: &Item,
            params: &LayoutParams,
        ) -> Result<CardDescriptor, CardError> {
            derive_card(item, params.options, params.width)
        }

        fn size(&self, descriptor: &CardDescriptor, _params: &LayoutParams) -> u32 {
            descriptor.title.parse().unwrap_or(0)
        }
    }

    fn params(separator: u32) -> LayoutParams {
        LayoutParams {
            width: 40,
            options: CardOptions::default(),
            separator,
        }
    }

    fn item(id: u64, title: &str) -> Arc<Item> {
        Arc::new(notification(id, title))
    }

    #[test]
    fn offsets_accumulate_lengths_and_separators() {
        let mut cache = LayoutCache::with_layout(TitleHeights);
        let items = vec![item(1, "40"), item(2, "60")];

        let pass = cache.derive_layout(&items, &params(8));

        assert_eq!(
            pass.records.as_ref(),
            &[
                LayoutRecord {
                    index: 0,
                    offset: 0,
                    length: 40
                },
                LayoutRecord {
                    index: 1,
                    offset: 48,
                    length: 60
                },
            ]
        );
        assert_eq!(cache.total_extent(), 116);
        assert_eq!(cache.index_at_offset(47), Some(0));
        assert_eq!(cache.index_at_offset(48), Some(1));
    }

    #[test]
    fn replacing_one_item_only_rederives_that_item() {
        let mut cache = LayoutCache::new();
        let (a, b, c) = (item(1, "a"), item(2, "b"), item(3, "c"));
        let first = cache.derive_layout(&[a.clone(), b, c.clone()], &params(1));
        assert_eq!(first.derived, 3);

        let b2 = item(2, "b, edited");
        let second = cache.derive_layout(&[a, b2, c], &params(1));

        assert_eq!(second.derived, 1);
        assert_eq!(second.reused, 2);
        let (before, after) = (&first.descriptors, &second.descriptors);
        assert!(Arc::ptr_eq(
            before[0].as_ref().unwrap(),
            after[0].as_ref().unwrap()
        ));
        assert!(!Arc::ptr_eq(
            before[1].as_ref().unwrap(),
            after[1].as_ref().unwrap()
        ));
        assert!(Arc::ptr_eq(
            before[2].as_ref().unwrap(),
            after[2].as_ref().unwrap()
        ));
    }

    #[test]
    fn slots_drop_out_when_identity_disappears() {
        let mut cache = LayoutCache::new();
        cache.derive_layout(&[item(1, "a"), item(2, "b")], &params(1));
        assert_eq!(cache.cached(), 2);

        cache.derive_layout(&[item(1, "a")], &params(1));
        assert_eq!(cache.cached(), 1);
    }

    #[test]
    fn failed_descriptor_gets_zero_length_and_keeps_separator() {
        let mut cache = LayoutCache::with_layout(TitleHeights);
        let items = vec![item(1, "10"), item(2, "  "), item(3, "10")];

        let pass = cache.derive_layout(&items, &params(2));

        assert!(pass.descriptors[1].is_none());
        assert_eq!(pass.records[1].length, 0);
        assert_eq!(pass.records[1].offset, 12);
        assert_eq!(pass.records[2].offset, 14);
    }

    #[test]
    fn param_change_discards_cache() {
        let mut cache = LayoutCache::new();
        let items = vec![item(1, "a"), item(2, "b")];
        cache.derive_layout(&items, &params(1));

        let narrower = LayoutParams {
            width: 20,
            ..params(1)
        };
        let pass = cache.derive_layout(&items, &narrower);

        assert_eq!(pass.derived, 2);
        assert_eq!(pass.reused, 0);
    }

    #[test]
    fn items_without_identity_are_always_derived() {
        let mut cache = LayoutCache::new();
        let mut raw = notification(0, "anonymous");
        raw.id = None;
        let items = vec![Arc::new(raw)];

        cache.derive_layout(&items, &params(1));
        let pass = cache.derive_layout(&items, &params(1));

        assert_eq!(pass.derived, 1);
        assert_eq!(cache.cached(), 0);
        assert_eq!(pass.records.len(), 1);
    }

    #[test]
    fn empty_items_produce_empty_pass() {
        let mut cache = LayoutCache::new();
        cache.derive_layout(&[item(1, "a")], &params(1));

        let pass = cache.derive_layout(&[], &params(1));

        assert!(pass.records.is_empty());
        assert_eq!(cache.cached(), 0);
        assert_eq!(cache.index_at_offset(0), None);
    }

    #[test]
    fn reset_forgets_slots_and_offsets() {
        let mut cache = LayoutCache::new();
        cache.derive_layout(&[item(1, "a"), item(2, "b")], &params(1));

        cache.reset();

        assert_eq!(cache.cached(), 0);
        assert_eq!(cache.total_extent(), 0);
        assert_eq!(cache.index_at_offset(0), None);
    }

    #[test]
    fn huge_separator_keeps_offsets_in_u64() {
        let mut cache = LayoutCache::with_layout(TitleHeights);
        let items = vec![item(1, "3"), item(2, "4")];

        let pass = cache.derive_layout(&items, &params(u32::MAX));

        let extent = 3 + u64::from(u32::MAX);
        assert_eq!(pass.records[1].offset, extent);
        assert_eq!(cache.total_extent(), extent + 4 + u64::from(u32::MAX));
        assert_eq!(cache.index_at_offset(extent), Some(1));
    }

    #[test]
    fn same_order_updates_offsets_in_place() {
        let mut cache = LayoutCache::with_layout(TitleHeights);
        cache.derive_layout(&[item(1, "5"), item(2, "5")], &params(0));

        cache.derive_layout(&[item(1, "9"), item(2, "5")], &params(0));

        assert_eq!(cache.total_extent(), 14);
        assert_eq!(cache.index_at_offset(9), Some(1));
    }

    proptest! {
        #[test]
        fn prop_records_satisfy_offset_invariant(
            lengths in prop::collection::vec(0u32..500, 0..80),
            separator in 0u32..16
        ) {
            let records = layout_records(&lengths, separator);

            prop_assert_eq!(records.len(), lengths.len());
            for (i, record) in records.iter().enumerate() {
                prop_assert_eq!(record.index, i);
                prop_assert_eq!(record.length, lengths[i]);
                if i == 0 {
                    prop_assert_eq!(record.offset, 0);
                } else {
                    let prev = &records[i - 1];
                    prop_assert_eq!(
                        record.offset,
                        prev.offset + u64::from(prev.length) + u64::from(separator)
                    );
                }
            }
        }
    }
}
