//! The slotted page implementation.

use quill_common::constants::{MAX_SLOTTED_PAGE_SIZE, SLOTTED_HEADER_SIZE, SLOT_SIZE};

use super::error::{PageError, PageResult};

/// A slot id is an index into the page's slot directory.
pub type SlotId = u16;

const SLOT_COUNT_OFFSET: usize = 0;
const FREE_SPACE_POINTER_OFFSET: usize = 2;

/// Mask for the 15-bit offset and length fields.
const FIELD_MASK: u32 = 0x7FFF;
/// Mask for the 2 flag bits.
const FLAG_MASK: u32 = 0x3;

/// State of a slot directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotFlag {
    /// A live tuple occupies `[offset, offset + length)`.
    Used = 0,
    /// Logically deleted: the slot id stays stable and the bytes survive
    /// until compaction, but the space is reclaimable.
    Dead = 1,
    /// Fully retired: the slot id may be handed to a new tuple, and the
    /// bytes are dropped by the next compaction.
    Unused = 2,
}

impl SlotFlag {
    /// Decodes the two flag bits. The value 3 is never written; it decodes
    /// as [`SlotFlag::Dead`] so the tuple bytes are preserved.
    fn from_bits(bits: u32) -> Self {
        match bits & FLAG_MASK {
            0 => Self::Used,
            2 => Self::Unused,
            _ => Self::Dead,
        }
    }
}

/// A decoded slot directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Byte offset of the tuple within the page.
    pub offset: u16,
    /// Tuple length in bytes.
    pub length: u16,
    /// Slot state.
    pub flag: SlotFlag,
}

impl Slot {
    /// Packs the slot into its on-page u32 representation:
    /// `offset << 17 | length << 2 | flags`.
    #[inline]
    #[must_use]
    pub fn pack(self) -> u32 {
        pack_slot(self.offset, self.length, self.flag as u8)
    }

    /// Decodes a slot from its on-page u32 representation, masking each
    /// field rather than assuming higher bits are zero.
    #[inline]
    #[must_use]
    pub fn unpack(raw: u32) -> Self {
        let (offset, length, flags) = unpack_slot(raw);
        Self {
            offset,
            length,
            flag: SlotFlag::from_bits(u32::from(flags)),
        }
    }
}

/// Packs raw slot fields. The flag bits are masked to two bits.
#[inline]
pub(crate) fn pack_slot(offset: u16, length: u16, flags: u8) -> u32 {
    (u32::from(offset) << 17) | (u32::from(length) << 2) | (u32::from(flags) & FLAG_MASK)
}

/// Unpacks raw slot fields, masking each on read.
#[inline]
pub(crate) fn unpack_slot(raw: u32) -> (u16, u16, u8) {
    let offset = ((raw >> 17) & FIELD_MASK) as u16;
    let length = ((raw >> 2) & FIELD_MASK) as u16;
    let flags = (raw & FLAG_MASK) as u8;
    (offset, length, flags)
}

/// A slotted page view over a byte buffer.
///
/// Pure in-memory layout logic: no I/O, no locking. The buffer length is the
/// page size; it need not match the disk page size, which keeps the layout
/// testable on tiny buffers.
///
/// A freshly allocated disk page is all zeros and is *not* self-describing;
/// callers must [`init`](SlottedPage::init) a page before first use.
///
/// # Example
///
/// ```rust
/// use quill_storage::page::SlottedPage;
///
/// let mut buffer = vec![0u8; 128];
/// let mut page = SlottedPage::wrap(&mut buffer);
/// page.init();
///
/// let slot = page.insert_tuple(b"hello").unwrap();
/// assert_eq!(page.get_tuple(slot).unwrap(), b"hello");
/// ```
pub struct SlottedPage<'a> {
    data: &'a mut [u8],
}

impl<'a> SlottedPage<'a> {
    /// Wraps a byte buffer as a slotted page.
    ///
    /// # Panics
    ///
    /// Panics if the buffer cannot hold the header or exceeds the 15-bit
    /// addressing limit of the slot fields.
    #[must_use]
    pub fn wrap(data: &'a mut [u8]) -> Self {
        assert!(
            data.len() >= SLOTTED_HEADER_SIZE,
            "buffer too small for slotted page header"
        );
        assert!(
            data.len() <= MAX_SLOTTED_PAGE_SIZE,
            "buffer exceeds 15-bit slot addressing"
        );
        Self { data }
    }

    /// Initializes the header of a new empty page: no slots, free space
    /// pointer at the end of the buffer.
    pub fn init(&mut self) {
        self.set_slot_count(0);
        self.set_free_space_pointer(self.data.len() as u16);
    }

    /// Returns the number of slot directory entries.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> u16 {
        u16::from_le_bytes([
            self.data[SLOT_COUNT_OFFSET],
            self.data[SLOT_COUNT_OFFSET + 1],
        ])
    }

    /// Inserts a tuple and returns its slot id.
    ///
    /// The first Unused slot is reused; otherwise a new slot is appended.
    /// If contiguous free space is short but the total (with holes) would
    /// fit, the page is compacted first.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::PageFull`] if the tuple cannot fit even after
    /// compaction.
    pub fn insert_tuple(&mut self, tuple: &[u8]) -> PageResult<SlotId> {
        let slot_id = self.find_slot_id();
        if !self.has_contiguous_space(slot_id, tuple.len()) {
            if !self.has_total_space(slot_id, tuple.len()) {
                return Err(PageError::PageFull);
            }
            self.compact();
        }
        self.write_tuple(slot_id, tuple);
        Ok(slot_id)
    }

    /// Returns the bytes of the tuple in `slot_id`.
    ///
    /// The flag state is not checked: a Dead or Unused slot still resolves
    /// to its last bytes. Callers that care about liveness track it
    /// themselves.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::SlotOutOfBounds`] if `slot_id` does not name an
    /// existing slot.
    pub fn get_tuple(&self, slot_id: SlotId) -> PageResult<&[u8]> {
        self.check_slot_bounds(slot_id)?;
        let slot = self.slot(slot_id);
        let start = slot.offset as usize;
        Ok(&self.data[start..start + slot.length as usize])
    }

    /// Marks the slot as Dead: logically deleted, slot id stable, space
    /// reclaimed at the next compaction.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::SlotOutOfBounds`] for a nonexistent slot.
    pub fn delete_tuple(&mut self, slot_id: SlotId) -> PageResult<()> {
        self.set_slot_flag(slot_id, SlotFlag::Dead)
    }

    /// Marks the slot as Unused, making its id reclaimable by a later
    /// insert.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::SlotOutOfBounds`] for a nonexistent slot.
    pub fn set_tuple_as_unused(&mut self, slot_id: SlotId) -> PageResult<()> {
        self.set_slot_flag(slot_id, SlotFlag::Unused)
    }

    /// First Unused slot id, or a fresh id at the end of the directory.
    fn find_slot_id(&self) -> SlotId {
        let count = self.slot_count();
        (0..count)
            .find(|&i| self.slot(i).flag == SlotFlag::Unused)
            .unwrap_or(count)
    }

    /// Fast check: does the gap between the slot directory and the tuple
    /// region fit the tuple (plus a new slot if one must be appended)?
    fn has_contiguous_space(&self, slot_id: SlotId, tuple_len: usize) -> bool {
        let fsp = self.free_space_pointer() as usize;
        let slots_end = SLOTTED_HEADER_SIZE + SLOT_SIZE * self.slot_count() as usize;
        // saturating: a corrupt header must not wrap the subtraction
        fsp.saturating_sub(slots_end) >= tuple_len + self.new_slot_cost(slot_id)
    }

    /// Total check: would the tuple fit if all holes were squeezed out?
    fn has_total_space(&self, slot_id: SlotId, tuple_len: usize) -> bool {
        let count = self.slot_count();
        let live_tuples_size: usize = (0..count)
            .map(|i| self.slot(i))
            .filter(|s| s.flag != SlotFlag::Unused)
            .map(|s| s.length as usize)
            .sum();

        let overhead = SLOTTED_HEADER_SIZE + SLOT_SIZE * count as usize;
        let available = self
            .data
            .len()
            .saturating_sub(overhead)
            .saturating_sub(live_tuples_size);
        available >= tuple_len + self.new_slot_cost(slot_id)
    }

    fn new_slot_cost(&self, slot_id: SlotId) -> usize {
        if slot_id < self.slot_count() {
            0
        } else {
            SLOT_SIZE
        }
    }

    /// Copies the tuple in below the free space pointer and writes its slot.
    fn write_tuple(&mut self, slot_id: SlotId, tuple: &[u8]) {
        let count = self.slot_count();
        let fsp = self.free_space_pointer() as usize;
        let start = fsp - tuple.len();

        self.data[start..fsp].copy_from_slice(tuple);
        self.set_slot(
            slot_id,
            Slot {
                offset: start as u16,
                length: tuple.len() as u16,
                flag: SlotFlag::Used,
            },
        );
        self.set_free_space_pointer(start as u16);
        if slot_id >= count {
            self.set_slot_count(count + 1);
        }
    }

    /// Repacks all non-Unused tuples against the tail of the page in
    /// slot-id order, preserving slot ids, lengths, and flags. Only Unused
    /// slots lose their storage; `slot_count` does not change.
    fn compact(&mut self) {
        let count = self.slot_count();

        // Copy the tuples out: the rewrite below overlaps source and
        // destination regions.
        let mut live: Vec<(SlotId, Slot, Vec<u8>)> = Vec::new();
        for slot_id in 0..count {
            let slot = self.slot(slot_id);
            if slot.flag == SlotFlag::Unused {
                continue;
            }
            let start = slot.offset as usize;
            let bytes = self.data[start..start + slot.length as usize].to_vec();
            live.push((slot_id, slot, bytes));
        }

        let mut fsp = self.data.len();
        for (slot_id, slot, bytes) in live {
            let start = fsp - bytes.len();
            self.data[start..fsp].copy_from_slice(&bytes);
            self.set_slot(
                slot_id,
                Slot {
                    offset: start as u16,
                    length: slot.length,
                    flag: slot.flag,
                },
            );
            fsp = start;
        }
        self.set_free_space_pointer(fsp as u16);
    }

    fn set_slot_flag(&mut self, slot_id: SlotId, flag: SlotFlag) -> PageResult<()> {
        self.check_slot_bounds(slot_id)?;
        let raw = self.raw_slot(slot_id);
        self.set_raw_slot(slot_id, (raw & !FLAG_MASK) | flag as u32);
        Ok(())
    }

    fn check_slot_bounds(&self, slot_id: SlotId) -> PageResult<()> {
        let slot_count = self.slot_count();
        if slot_id >= slot_count {
            return Err(PageError::SlotOutOfBounds {
                slot_id,
                slot_count,
            });
        }
        Ok(())
    }

    fn slot_offset(slot_id: SlotId) -> usize {
        SLOTTED_HEADER_SIZE + SLOT_SIZE * slot_id as usize
    }

    fn raw_slot(&self, slot_id: SlotId) -> u32 {
        let at = Self::slot_offset(slot_id);
        u32::from_le_bytes([
            self.data[at],
            self.data[at + 1],
            self.data[at + 2],
            self.data[at + 3],
        ])
    }

    fn set_raw_slot(&mut self, slot_id: SlotId, raw: u32) {
        let at = Self::slot_offset(slot_id);
        self.data[at..at + SLOT_SIZE].copy_from_slice(&raw.to_le_bytes());
    }

    fn slot(&self, slot_id: SlotId) -> Slot {
        Slot::unpack(self.raw_slot(slot_id))
    }

    fn set_slot(&mut self, slot_id: SlotId, slot: Slot) {
        self.set_raw_slot(slot_id, slot.pack());
    }

    fn free_space_pointer(&self) -> u16 {
        u16::from_le_bytes([
            self.data[FREE_SPACE_POINTER_OFFSET],
            self.data[FREE_SPACE_POINTER_OFFSET + 1],
        ])
    }

    fn set_free_space_pointer(&mut self, fsp: u16) {
        self.data[FREE_SPACE_POINTER_OFFSET..FREE_SPACE_POINTER_OFFSET + 2]
            .copy_from_slice(&fsp.to_le_bytes());
    }

    fn set_slot_count(&mut self, count: u16) {
        self.data[SLOT_COUNT_OFFSET..SLOT_COUNT_OFFSET + 2].copy_from_slice(&count.to_le_bytes());
    }
}
