//! Tool-call reassembly.
//!
//! Vendors stream a tool invocation as one start marker (id + name) and a
//! series of argument fragments keyed by position. [`ToolCallAccumulator`]
//! stitches the fragments back together in arrival order.

use std::collections::BTreeMap;

use crate::types::ToolInvocation;

/// Accumulation state for one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallSlot {
    /// Vendor-assigned call identifier.
    pub id: String,
    /// Function name.
    pub name: String,
    /// Argument text received so far.
    pub arguments: String,
}

/// Per-stream map from tool-call index to its accumulated state.
#[derive(Debug, Default, Clone)]
pub struct ToolCallAccumulator {
    slots: BTreeMap<usize, ToolCallSlot>,
}

impl ToolCallAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a slot at `index`.
    ///
    /// Returns `false` (and changes nothing) if the index is already taken:
    /// id and name are fixed by the first start marker.
    pub fn start(&mut self, index: usize, id: impl Into<String>, name: impl Into<String>) -> bool {
        if self.slots.contains_key(&index) {
            return false;
        }
        self.slots.insert(
            index,
            ToolCallSlot {
                id: id.into(),
                name: name.into(),
                arguments: String::new(),
            },
        );
        true
    }

    /// Append an argument fragment to the slot at `index`.
    ///
    /// Returns `false` if no slot was started at that index; the fragment is
    /// dropped.
    pub fn append(&mut self, index: usize, fragment: &str) -> bool {
        match self.slots.get_mut(&index) {
            Some(slot) => {
                slot.arguments.push_str(fragment);
                true
            }
            None => false,
        }
    }

    /// The slot at `index`, if started.
    pub fn get(&self, index: usize) -> Option<&ToolCallSlot> {
        self.slots.get(&index)
    }

    /// Number of started slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot has been started.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Snapshot every slot as a completed invocation, ordered by index.
    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.slots
            .values()
            .map(|slot| ToolInvocation {
                id: slot.id.clone(),
                name: slot.name.clone(),
                arguments: slot.arguments.clone(),
            })
            .collect()
    }
}
