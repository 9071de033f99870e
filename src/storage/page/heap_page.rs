use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};

use crate::common::{
    FileId, HeapDbError, PageId, RecordId, Result, SlotId, TransactionId, HEAP_PAGE_HEADER_SIZE,
    PAGE_SIZE,
};
use crate::tuple::{Tuple, TupleDesc};

/// A heap page holds fixed-width tuples in an array of slots.
///
/// ## Page Layout
///
/// ```text
/// +------------------+----------------------+---------------------------+
/// | SlotNum (4)      | UsedSlotsNum (4)     | Slot 0 | Slot 1 | ...     |
/// +------------------+----------------------+---------------------------+
/// ```
///
/// Both header fields are little-endian i32. Live tuples always occupy the
/// first `UsedSlotsNum` slots on disk; the remaining slots and the tail of
/// the page are zero-filled.
///
/// In memory, deleting a tuple leaves a hole so the record ids of the other
/// tuples stay valid. Holes are squeezed out the next time the page is
/// serialized, which is safe because dirty pages are never evicted.
#[derive(Debug, Clone)]
pub struct HeapPage {
    desc: Arc<TupleDesc>,
    page_id: PageId,
    file_id: FileId,
    num_slots: usize,
    /// Slots handed out so far; `None` marks a deleted tuple
    slots: Vec<Option<Tuple>>,
    is_dirty: bool,
    dirtied_by: Option<TransactionId>,
}

impl HeapPage {
    /// Creates an empty page for tuples of `desc`.
    pub fn new(desc: Arc<TupleDesc>, page_id: PageId, file_id: FileId) -> Self {
        let num_slots = desc.slots_per_page();
        Self {
            desc,
            page_id,
            file_id,
            num_slots,
            slots: Vec::with_capacity(num_slots),
            is_dirty: false,
            dirtied_by: None,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    /// Total number of slots on the page.
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Slots handed out so far, including holes left by deletes.
    pub fn used_slots(&self) -> usize {
        self.slots.len()
    }

    /// Number of live tuples.
    pub fn tuple_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn has_free_slot(&self) -> bool {
        self.slots.len() < self.num_slots
    }

    /// Stores `tuple` in the next unused slot and stamps it with its record id.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> Result<RecordId> {
        if !self.has_free_slot() {
            return Err(HeapDbError::PageFull);
        }
        let rid = RecordId::new(self.page_id, SlotId::new(self.slots.len() as u16));
        tuple.set_rid(Some(rid));
        self.slots.push(Some(tuple));
        Ok(rid)
    }

    /// Removes the tuple in `slot`, leaving a hole.
    pub fn delete_tuple(&mut self, slot: SlotId) -> Result<()> {
        let index = slot.as_u16() as usize;
        match self.slots.get_mut(index) {
            None => Err(HeapDbError::InvalidSlotId(slot.as_u16())),
            Some(None) => Err(HeapDbError::EmptySlot(slot.as_u16())),
            Some(entry) => {
                *entry = None;
                Ok(())
            }
        }
    }

    /// Returns the tuple stored in `slot`, if any.
    pub fn tuple(&self, slot: SlotId) -> Option<&Tuple> {
        self.slots.get(slot.as_u16() as usize).and_then(Option::as_ref)
    }

    /// Live tuples in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.slots.iter().flatten()
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Transaction that last dirtied the page, if it is dirty.
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    pub fn set_dirty(&mut self, tid: TransactionId, dirty: bool) {
        self.is_dirty = dirty;
        self.dirtied_by = if dirty { Some(tid) } else { None };
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
        self.dirtied_by = None;
    }

    /// Serializes the page into exactly PAGE_SIZE bytes, compacting holes.
    pub fn to_bytes(&self) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(PAGE_SIZE);
        buf.put_i32_le(self.num_slots as i32);
        buf.put_i32_le(self.tuple_count() as i32);
        for tuple in self.iter() {
            tuple.write_to(&mut buf)?;
        }
        if buf.len() > PAGE_SIZE {
            return Err(HeapDbError::Malformed(format!(
                "page {} serializes to {} bytes",
                self.page_id,
                buf.len()
            )));
        }
        buf.resize(PAGE_SIZE, 0);
        Ok(buf)
    }

    /// Decodes a page image. Tuples get record ids matching their slots.
    pub fn from_bytes(
        desc: Arc<TupleDesc>,
        page_id: PageId,
        file_id: FileId,
        data: &[u8],
    ) -> Result<Self> {
        if data.len() < HEAP_PAGE_HEADER_SIZE {
            return Err(HeapDbError::Malformed(format!(
                "page {} is only {} bytes",
                page_id,
                data.len()
            )));
        }
        let mut page = HeapPage::new(desc, page_id, file_id);
        let mut buf = data;
        let stored_slots = buf.get_i32_le();
        let used = buf.get_i32_le();

        if stored_slots < 0 || stored_slots as usize != page.num_slots {
            return Err(HeapDbError::Malformed(format!(
                "page {} has {} slots, expected {}",
                page_id, stored_slots, page.num_slots
            )));
        }
        if used < 0 || used > stored_slots {
            return Err(HeapDbError::Malformed(format!(
                "page {} claims {} used slots of {}",
                page_id, used, stored_slots
            )));
        }

        for _ in 0..used {
            let tuple = Tuple::read_from(&mut buf, page.desc.clone())?;
            page.insert_tuple(tuple)?;
        }
        Ok(page)
    }
}

impl PartialEq for HeapPage {
    fn eq(&self, other: &Self) -> bool {
        self.page_id == other.page_id
            && self.desc == other.desc
            && self.iter().eq(other.iter())
    }
}
