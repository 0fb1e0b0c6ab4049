//! DMA descriptor memory and chain builder
//!
//! The controller fetches pixels by walking linked lists of 16-byte
//! descriptors in device memory. Descriptor memory has two parts:
//!
//! - the [`ControlBlock`]: one head descriptor per fetch channel, the
//!   palette descriptor and the palette payload itself;
//! - a slot arena: per-framebuffer runs of line descriptors, used when a
//!   plane is doublescanned.
//!
//! Links are kept as slot indices while building and only turned into
//! device addresses when written, so the cyclic structure never needs
//! self-referential pointers.
//!
//! ```text
//! single:      DA ─► head ─┐          (head.next = head, or palette)
//!                    ▲─────┘
//! doublescan:  DA ─► head(=line 0) ─► line 1 ─► … ─► line 2H-1 ─┐
//!                    ▲──────────────────────────────────────────┘
//! palette:     DA0 ─► pal ─► head0 ─► … ─► pal
//! ```

use platform::DeviceAddr;

use crate::error::ResourceExhaustionError;
use crate::plane::PlaneRole;
use crate::regs;

/// Size of one hardware descriptor in bytes
pub const DESCRIPTOR_SIZE: u32 = 16;

/// Hardware palette entry count
pub const PALETTE_ENTRIES: usize = 256;

/// Palette payload size in bytes
pub const PALETTE_BYTES: u32 = 512;

/// Descriptor id of the palette descriptor
pub const PALETTE_ID: u32 = 0xC0;

/// DMA descriptor as fetched by the controller
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HwDescriptor {
    /// Device address of the next descriptor
    pub next: u32,
    /// Device address of the payload
    pub addr: u32,
    /// Free-form tag, reported back through FID
    pub id: u32,
    /// Transfer length in words plus flag bits
    pub cmd: u32,
}

impl HwDescriptor {
    /// Transfer length in 32-bit words.
    pub const fn words(&self) -> u32 {
        self.cmd & regs::CMD_LEN_MASK
    }

    /// Whether fetching this descriptor ends the frame.
    pub const fn ends_frame(&self) -> bool {
        self.cmd & regs::CMD_EOF_IRQ != 0
    }

    /// Whether the payload is a palette.
    pub const fn loads_palette(&self) -> bool {
        self.cmd & regs::CMD_ENABLE_PAL != 0
    }
}

/// Fixed part of descriptor memory
#[repr(C, align(16))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlBlock {
    /// Head descriptor per fetch channel
    pub heads: [HwDescriptor; 2],
    /// Palette descriptor
    pub palette_desc: HwDescriptor,
    /// RGB565 palette payload
    pub palette: [u16; PALETTE_ENTRIES],
}

impl Default for ControlBlock {
    fn default() -> Self {
        Self {
            heads: [HwDescriptor::default(); 2],
            palette_desc: HwDescriptor::default(),
            palette: [0; PALETTE_ENTRIES],
        }
    }
}

/// Byte offset of the palette descriptor inside the [`ControlBlock`]
pub const PALETTE_DESC_OFFSET: u32 = 2 * DESCRIPTOR_SIZE;
/// Byte offset of the palette payload inside the [`ControlBlock`]
pub const PALETTE_OFFSET: u32 = 3 * DESCRIPTOR_SIZE;
/// Size of the [`ControlBlock`] in bytes
pub const CONTROL_BLOCK_SIZE: u32 = PALETTE_OFFSET + PALETTE_BYTES;

const _: () = assert!(core::mem::size_of::<HwDescriptor>() == DESCRIPTOR_SIZE as usize);
const _: () = assert!(core::mem::size_of::<ControlBlock>() == CONTROL_BLOCK_SIZE as usize);

/// Device-visible memory backing the descriptors
///
/// Both regions must be mapped coherently (or uncached) for the
/// controller; the engine never issues cache maintenance for them.
pub trait DescriptorMemory {
    /// Fixed descriptors and palette.
    fn control(&self) -> &ControlBlock;

    /// Fixed descriptors and palette, mutably.
    fn control_mut(&mut self) -> &mut ControlBlock;

    /// Device address of the control block.
    fn control_phys(&self) -> DeviceAddr;

    /// Line-descriptor arena.
    fn slots(&self) -> &[HwDescriptor];

    /// Line-descriptor arena, mutably.
    fn slots_mut(&mut self) -> &mut [HwDescriptor];

    /// Device address of slot 0.
    fn slots_phys(&self) -> DeviceAddr;

    /// Write back CPU caches over a framebuffer range before scan-out.
    ///
    /// Only called on controllers that map framebuffers non-coherently.
    fn flush_for_device(&mut self, _addr: DeviceAddr, _len: u32) {}
}

/// Descriptor memory in a plain static, at a known device address.
///
/// Place it in uncached memory and pass the bus address the controller
/// sees it at.
#[repr(C)]
pub struct StaticDescriptorMemory<const N: usize> {
    control: ControlBlock,
    slots: [HwDescriptor; N],
    phys: DeviceAddr,
}

impl<const N: usize> StaticDescriptorMemory<N> {
    /// Zeroed memory located at `phys` on the bus.
    pub fn new(phys: DeviceAddr) -> Self {
        Self {
            control: ControlBlock::default(),
            slots: [HwDescriptor::default(); N],
            phys,
        }
    }
}

impl<const N: usize> DescriptorMemory for StaticDescriptorMemory<N> {
    fn control(&self) -> &ControlBlock {
        &self.control
    }

    fn control_mut(&mut self) -> &mut ControlBlock {
        &mut self.control
    }

    fn control_phys(&self) -> DeviceAddr {
        self.phys
    }

    fn slots(&self) -> &[HwDescriptor] {
        &self.slots
    }

    fn slots_mut(&mut self) -> &mut [HwDescriptor] {
        &mut self.slots
    }

    fn slots_phys(&self) -> DeviceAddr {
        DeviceAddr(self.phys.get().saturating_add(CONTROL_BLOCK_SIZE))
    }
}

// ── Addressing ───────────────────────────────────────────────────────────────

/// Device address of the head descriptor for `role`.
pub fn head_addr<M: DescriptorMemory + ?Sized>(mem: &M, role: PlaneRole) -> DeviceAddr {
    offset(mem.control_phys(), role.index() as u32 * DESCRIPTOR_SIZE)
}

/// Device address of the palette descriptor.
pub fn palette_desc_addr<M: DescriptorMemory + ?Sized>(mem: &M) -> DeviceAddr {
    offset(mem.control_phys(), PALETTE_DESC_OFFSET)
}

/// Device address of the palette payload.
pub fn palette_addr<M: DescriptorMemory + ?Sized>(mem: &M) -> DeviceAddr {
    offset(mem.control_phys(), PALETTE_OFFSET)
}

/// Device address of arena slot `index`.
pub fn slot_addr<M: DescriptorMemory + ?Sized>(mem: &M, index: u32) -> DeviceAddr {
    offset(mem.slots_phys(), index.saturating_mul(DESCRIPTOR_SIZE))
}

fn offset(base: DeviceAddr, bytes: u32) -> DeviceAddr {
    DeviceAddr(base.get().wrapping_add(bytes))
}

/// Descriptor stored at device address `addr`, if it is one of ours.
pub fn lookup<M: DescriptorMemory + ?Sized>(mem: &M, addr: DeviceAddr) -> Option<HwDescriptor> {
    let control = mem.control_phys().get();
    if let Some(rel) = addr.get().checked_sub(control) {
        match rel {
            0 => return mem.control().heads.first().copied(),
            DESCRIPTOR_SIZE => return mem.control().heads.get(1).copied(),
            PALETTE_DESC_OFFSET => return Some(mem.control().palette_desc),
            _ => {}
        }
    }

    let rel = addr.get().checked_sub(mem.slots_phys().get())?;
    if rel % DESCRIPTOR_SIZE != 0 {
        return None;
    }
    mem.slots().get((rel / DESCRIPTOR_SIZE) as usize).copied()
}

/// Program the static links: each head loops on itself, the palette
/// descriptor feeds channel 0.
pub fn init_control_block<M: DescriptorMemory + ?Sized>(mem: &mut M) {
    let heads = [
        head_addr(mem, PlaneRole::Primary),
        head_addr(mem, PlaneRole::Overlay),
    ];
    let pal_payload = palette_addr(mem);

    let control = mem.control_mut();
    for (role, (head, addr)) in [PlaneRole::Primary, PlaneRole::Overlay]
        .into_iter()
        .zip(control.heads.iter_mut().zip(heads))
    {
        head.next = addr.get();
        head.id = role.descriptor_id();
    }

    control.palette_desc = HwDescriptor {
        next: heads[0].get(),
        addr: pal_payload.get(),
        id: PALETTE_ID,
        cmd: regs::CMD_ENABLE_PAL | (PALETTE_BYTES / 4),
    };
}

// ── Slot arena ───────────────────────────────────────────────────────────────

/// Contiguous run of arena slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotSpan {
    /// First slot index
    pub first: u32,
    /// Number of slots
    pub len: u32,
}

impl SlotSpan {
    /// One past the last slot.
    pub const fn end(&self) -> u32 {
        self.first.saturating_add(self.len)
    }
}

/// First-fit allocator over the slot arena
#[derive(Debug)]
pub struct SlotAllocator<const N: usize> {
    capacity: u32,
    used: heapless::Vec<SlotSpan, N>,
}

impl<const N: usize> SlotAllocator<N> {
    /// Allocator over `capacity` slots.
    pub const fn new(capacity: u32) -> Self {
        Self {
            capacity,
            used: heapless::Vec::new(),
        }
    }

    /// Reserve `len` contiguous slots.
    pub fn alloc(&mut self, len: u32) -> Result<SlotSpan, ResourceExhaustionError> {
        let mut cursor = 0u32;
        let mut largest = 0u32;
        let mut found = None;

        for (pos, span) in self.used.iter().enumerate() {
            let gap = span.first.saturating_sub(cursor);
            largest = largest.max(gap);
            if gap >= len {
                found = Some(pos);
                break;
            }
            cursor = span.end();
        }
        if found.is_none() {
            let tail = self.capacity.saturating_sub(cursor);
            largest = largest.max(tail);
            if tail >= len {
                found = Some(self.used.len());
            }
        }

        let exhausted = ResourceExhaustionError {
            requested: len,
            available: largest,
        };
        let pos = found.ok_or(exhausted)?;
        let span = SlotSpan { first: cursor, len };
        self.used.insert(pos, span).map_err(|_| exhausted)?;
        Ok(span)
    }

    /// Return a span obtained from [`SlotAllocator::alloc`].
    pub fn free(&mut self, span: SlotSpan) {
        self.used.retain(|s| *s != span);
    }

    /// Slots currently reserved.
    pub fn in_use(&self) -> u32 {
        self.used.iter().map(|s| s.len).sum()
    }
}

// ── Chain builder ────────────────────────────────────────────────────────────

/// How a plane's frame is split into transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChainLayout {
    /// One transfer for the whole frame
    Single,
    /// One transfer per output line, each source line sent twice
    Doublescan,
}

/// Inputs for one plane's chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainParams {
    /// Address of the first source pixel
    pub src: DeviceAddr,
    /// Framebuffer line stride in bytes
    pub pitch: u32,
    /// Source width in pixels
    pub width: u32,
    /// Source height in lines
    pub height: u32,
    /// Bytes per pixel
    pub cpp: u32,
    /// Descriptor fetched after the last transfer of the frame
    pub next: DeviceAddr,
    /// Tag written into every descriptor
    pub id: u32,
}

/// Whole-frame descriptor.
#[allow(clippy::arithmetic_side_effects)] // Safety: framebuffer geometry is bounded by create_framebuffer (dimensions < 4096, cpp <= 4)
pub fn single(params: &ChainParams) -> HwDescriptor {
    HwDescriptor {
        next: params.next.get(),
        addr: params.src.get(),
        id: params.id,
        cmd: regs::CMD_EOF_IRQ | (params.width * params.height * params.cpp / 4),
    }
}

/// Fill `lines` with a doublescan chain of `2 * params.height` nodes.
///
/// `lines_phys` is the device address of `lines[0]`. Node `i` fetches
/// source line `i / 2` and links to node `i + 1`; the last node ends the
/// frame and links to `params.next`. Returns a copy of node 0 for the
/// channel head.
#[allow(clippy::arithmetic_side_effects)] // Safety: i < 2 * height, bounded by the slot run; pitch * (i/2) stays inside the framebuffer
pub fn doublescan(
    lines: &mut [HwDescriptor],
    lines_phys: DeviceAddr,
    params: &ChainParams,
) -> Result<HwDescriptor, ResourceExhaustionError> {
    let count = params.height.saturating_mul(2);
    let available = lines.len() as u32;
    let run = lines
        .get_mut(..count as usize)
        .filter(|run| !run.is_empty())
        .ok_or(ResourceExhaustionError {
            requested: count,
            available,
        })?;

    let line_words = params.pitch / 4;
    for (i, node) in (0u32..).zip(run.iter_mut()) {
        *node = HwDescriptor {
            next: lines_phys.get().wrapping_add((i + 1) * DESCRIPTOR_SIZE),
            addr: params.src.get().wrapping_add((i / 2) * params.pitch),
            id: params.id,
            cmd: line_words,
        };
    }

    let (first, rest) = run.split_first_mut().ok_or(ResourceExhaustionError {
        requested: count,
        available: 0,
    })?;
    let last = rest.last_mut().unwrap_or(first);
    last.cmd |= regs::CMD_EOF_IRQ;
    last.next = params.next.get();

    Ok(*first)
}

/// Walk a channel's chain from `start`, calling `visit` on every node
/// until the chain loops back to `start` or `limit` nodes were seen.
///
/// Returns the number of nodes visited.
pub fn walk<M, F>(mem: &M, start: DeviceAddr, limit: usize, mut visit: F) -> usize
where
    M: DescriptorMemory + ?Sized,
    F: FnMut(DeviceAddr, &HwDescriptor),
{
    let mut addr = start;
    let mut seen = 0usize;
    while seen < limit {
        let Some(node) = lookup(mem, addr) else {
            break;
        };
        visit(addr, &node);
        seen = seen.saturating_add(1);
        addr = DeviceAddr(node.next);
        if addr == start {
            break;
        }
    }
    seen
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;

    const PHYS: DeviceAddr = DeviceAddr(0x0100_0000);

    fn params(height: u32, next: DeviceAddr) -> ChainParams {
        ChainParams {
            src: DeviceAddr(0x0200_0000),
            pitch: 640,
            width: 320,
            height,
            cpp: 2,
            next,
            id: 0xF0,
        }
    }

    #[test]
    fn control_block_layout_matches_hardware() {
        assert_eq!(CONTROL_BLOCK_SIZE, 560);
        assert_eq!(core::mem::align_of::<ControlBlock>(), 16);
    }

    #[test]
    fn init_links_heads_to_themselves_and_palette_to_channel_0() {
        let mut mem = StaticDescriptorMemory::<4>::new(PHYS);
        init_control_block(&mut mem);
        let c = mem.control();
        assert_eq!(c.heads[0].next, PHYS.get());
        assert_eq!(c.heads[1].next, PHYS.get() + 16);
        assert_eq!((c.heads[0].id, c.heads[1].id), (0xF0, 0xF1));
        assert_eq!(c.palette_desc.next, PHYS.get());
        assert_eq!(c.palette_desc.addr, PHYS.get() + 48);
        assert_eq!(c.palette_desc.cmd, regs::CMD_ENABLE_PAL | 128);
        assert_eq!(c.palette_desc.id, PALETTE_ID);
    }

    #[test]
    fn single_descriptor_covers_whole_frame() {
        let desc = single(&params(240, PHYS));
        assert_eq!(desc.words(), 320 * 240 * 2 / 4);
        assert!(desc.ends_frame());
        assert_eq!(desc.next, PHYS.get());
    }

    #[test]
    fn doublescan_repeats_each_line_and_flags_only_the_last() {
        let mut lines = [HwDescriptor::default(); 8];
        let lines_phys = DeviceAddr(0x0300_0000);
        let head = doublescan(&mut lines, lines_phys, &params(4, PHYS)).unwrap();

        assert_eq!(head, lines[0]);
        for (i, node) in lines.iter().enumerate() {
            assert_eq!(node.addr, 0x0200_0000 + (i as u32 / 2) * 640);
            assert_eq!(node.words(), 640 / 4);
            assert_eq!(node.ends_frame(), i == 7);
        }
        assert_eq!(lines[0].next, lines_phys.get() + 16);
        assert_eq!(lines[7].next, PHYS.get());
    }

    #[test]
    fn doublescan_rejects_short_slot_run() {
        let mut lines = [HwDescriptor::default(); 3];
        let err = doublescan(&mut lines, PHYS, &params(2, PHYS)).unwrap_err();
        assert_eq!(err.requested, 4);
        assert_eq!(err.available, 3);
    }

    #[test]
    fn doublescan_reports_free_lines_for_an_empty_frame() {
        let mut lines = [HwDescriptor::default(); 6];
        let err = doublescan(&mut lines, PHYS, &params(0, PHYS)).unwrap_err();
        assert_eq!((err.requested, err.available), (0, 6));
        assert!(lines.iter().all(|node| *node == HwDescriptor::default()));
    }

    #[test]
    fn lookup_resolves_control_block_and_slots() {
        let mut mem = StaticDescriptorMemory::<4>::new(PHYS);
        init_control_block(&mut mem);
        mem.slots_mut()[2].id = 0x77;

        assert_eq!(
            lookup(&mem, palette_desc_addr(&mem)).unwrap().id,
            PALETTE_ID
        );
        assert_eq!(lookup(&mem, slot_addr(&mem, 2)).unwrap().id, 0x77);
        assert!(lookup(&mem, slot_addr(&mem, 9)).is_none());
        assert!(lookup(&mem, palette_addr(&mem)).is_none());
    }

    #[test]
    fn allocator_first_fit_reuses_freed_gap() {
        let mut alloc = SlotAllocator::<4>::new(100);
        let a = alloc.alloc(40).unwrap();
        let b = alloc.alloc(40).unwrap();
        assert_eq!((a.first, b.first), (0, 40));

        let err = alloc.alloc(30).unwrap_err();
        assert_eq!(err.available, 20);

        alloc.free(a);
        let c = alloc.alloc(30).unwrap();
        assert_eq!(c.first, 0);
        assert_eq!(alloc.in_use(), 70);
    }

    #[test]
    fn walk_follows_palette_into_primary_chain() {
        let mut mem = StaticDescriptorMemory::<4>::new(PHYS);
        init_control_block(&mut mem);
        let pal = palette_desc_addr(&mem);
        mem.control_mut().heads[0] = single(&params(240, pal));

        let mut ids = heapless::Vec::<u32, 4>::new();
        let n = walk(&mem, pal, 16, |_, d| ids.push(d.id).unwrap());
        assert_eq!(n, 2);
        assert_eq!(ids.as_slice(), &[PALETTE_ID, 0xF0]);
    }
}
