//! Text object registry
//!
//! Slot-based storage for live text instances. Handles are slot indices
//! plus a per-slot generation; a stale handle (destroyed or reused slot)
//! simply resolves to nothing, so UI code racing destruction against
//! queued input events never faults.

use crate::mesh::TextGeometry;

/// Rebuild/upload state of one text object.
///
/// `NeedsRebuild` means the content changed and the mesh is stale;
/// `NeedsUpload` means the mesh bytes changed and the GPU buffer is stale.
/// The enum makes "rebuilt but also not rebuilt" unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dirty {
    Clean,
    #[default]
    NeedsRebuild,
    NeedsUpload,
}

/// Stable reference to a registry slot.
///
/// The generation catches use-after-destroy: a handle whose generation no
/// longer matches its slot is treated exactly like an out-of-range one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextHandle {
    index: i32,
    generation: u32,
}

impl TextHandle {
    pub const INVALID: Self = Self {
        index: -1,
        generation: 0,
    };

    pub fn is_valid(&self) -> bool {
        self.index >= 0
    }

    /// Slot index, or -1 for the invalid handle
    pub fn index(&self) -> i32 {
        self.index
    }
}

impl Default for TextHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

/// One renderable, selectable string
#[derive(Debug, Default)]
pub struct TextObject {
    pub text: String,
    /// Screen position of the pen origin: left edge, baseline y
    pub x: f32,
    pub baseline_y: f32,
    /// Solid RGBA color, 0.0-1.0
    pub color: [f32; 4],
    pub geometry: TextGeometry,
    pub dirty: Dirty,
    pub selectable: bool,
    /// Drag in progress
    pub selecting: bool,
    /// Selection anchor (codepoint index)
    pub sel_a: usize,
    /// Selection active end (codepoint index)
    pub sel_b: usize,
    /// Caret codepoint index
    pub caret: usize,
}

impl TextObject {
    fn new() -> Self {
        Self {
            color: [1.0, 1.0, 1.0, 1.0],
            selectable: true,
            ..Self::default()
        }
    }

    /// Color packed to unorm bytes for the vertex stream
    pub fn packed_color(&self) -> [u8; 4] {
        let pack = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [
            pack(self.color[0]),
            pack(self.color[1]),
            pack(self.color[2]),
            pack(self.color[3]),
        ]
    }
}

#[derive(Debug)]
struct Slot {
    object: TextObject,
    generation: u32,
    alive: bool,
}

/// Slot array owning every text object
#[derive(Debug, Default)]
pub struct TextRegistry {
    slots: Vec<Slot>,
}

impl TextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new object, reusing the first dead slot before growing.
    pub fn create(&mut self) -> TextHandle {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !slot.alive {
                slot.object = TextObject::new();
                slot.generation = slot.generation.wrapping_add(1);
                slot.alive = true;
                return TextHandle {
                    index: index as i32,
                    generation: slot.generation,
                };
            }
        }

        self.slots.push(Slot {
            object: TextObject::new(),
            generation: 0,
            alive: true,
        });
        TextHandle {
            index: (self.slots.len() - 1) as i32,
            generation: 0,
        }
    }

    /// Mark a slot dead for reuse. Stale handles are ignored. The slot
    /// array never compacts, so handles into higher slots stay valid.
    pub fn destroy(&mut self, handle: TextHandle) {
        let Some(index) = self.slot_index(handle) else {
            return;
        };
        self.slots[index].alive = false;
    }

    pub fn get(&self, handle: TextHandle) -> Option<&TextObject> {
        self.slot_index(handle).map(|i| &self.slots[i].object)
    }

    pub fn get_mut(&mut self, handle: TextHandle) -> Option<&mut TextObject> {
        self.slot_index(handle).map(|i| &mut self.slots[i].object)
    }

    /// Live objects with their handles, in slot order
    pub fn iter(&self) -> impl Iterator<Item = (TextHandle, &TextObject)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.alive.then_some((
                TextHandle {
                    index: index as i32,
                    generation: slot.generation,
                },
                &slot.object,
            ))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (TextHandle, &mut TextObject)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            slot.alive.then_some((
                TextHandle {
                    index: index as i32,
                    generation: slot.generation,
                },
                &mut slot.object,
            ))
        })
    }

    /// Number of slots, live or dead (the GPU layer sizes buffers by this)
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.alive).count()
    }

    /// Destroy every object
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.alive = false;
        }
    }

    fn slot_index(&self, handle: TextHandle) -> Option<usize> {
        if handle.index < 0 {
            return None;
        }
        let index = handle.index as usize;
        let slot = self.slots.get(index)?;
        (slot.alive && slot.generation == handle.generation).then_some(index)
    }
}
