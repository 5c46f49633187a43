//! Generation-tagged slot storage.
//!
//! Bodies, constraints, hooks, gas cells and boundaries all live in an
//! [`Arena`]. Removing an entry pushes its slot onto a freelist, and the next
//! insertion reuses the most recently freed slot. Every reuse bumps the slot
//! generation, so a [`Handle`] that outlived its entry no longer resolves:
//!
//! ```
//! use mech_types::Arena;
//!
//! let mut arena = Arena::new();
//! let a = arena.insert("a");
//! arena.remove(a);
//! let b = arena.insert("b");
//!
//! assert_eq!(a.index(), b.index());
//! assert!(arena.get(a).is_none());
//! assert_eq!(arena.get(b), Some(&"b"));
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Result, SimError};

/// Untyped arena handle: slot index plus generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Create a handle from raw parts.
    #[must_use]
    pub const fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this handle was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// The error reported when this handle no longer resolves.
    #[must_use]
    pub const fn stale(self) -> SimError {
        SimError::StaleHandle {
            index: self.index,
            generation: self.generation,
        }
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
enum Slot<T> {
    Occupied { generation: u32, value: T },
    Free { generation: u32, next_free: Option<u32> },
}

/// Sparse storage with freelist reuse and generation checks.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    /// Create an empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Number of live entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the arena holds no live entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots, live or free. Slot indices are always below this.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Insert a value, reusing the most recently freed slot if any.
    #[allow(clippy::cast_possible_truncation)]
    pub fn insert(&mut self, value: T) -> Handle {
        self.len += 1;
        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            let (generation, next_free) = match *slot {
                Slot::Free {
                    generation,
                    next_free,
                } => (generation.wrapping_add(1), next_free),
                Slot::Occupied { .. } => unreachable!("freelist points at an occupied slot"),
            };
            *slot = Slot::Occupied { generation, value };
            self.free_head = next_free;
            Handle { index, generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot::Occupied {
                generation: 0,
                value,
            });
            Handle {
                index,
                generation: 0,
            }
        }
    }

    /// Remove the entry behind `handle`, freeing its slot.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index())?;
        match slot {
            Slot::Occupied { generation, .. } if *generation == handle.generation => {}
            _ => return None,
        }
        let freed = Slot::Free {
            generation: handle.generation,
            next_free: self.free_head,
        };
        let Slot::Occupied { value, .. } = std::mem::replace(slot, freed) else {
            return None;
        };
        self.free_head = Some(handle.index);
        self.len -= 1;
        Some(value)
    }

    /// Whether `handle` still resolves.
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Shared access by handle.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        match self.slots.get(handle.index())? {
            Slot::Occupied { generation, value } if *generation == handle.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Mutable access by handle.
    #[must_use]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        match self.slots.get_mut(handle.index())? {
            Slot::Occupied { generation, value } if *generation == handle.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Shared access, reporting a stale handle as an error.
    pub fn try_get(&self, handle: Handle) -> Result<&T> {
        self.get(handle).ok_or_else(|| handle.stale())
    }

    /// Mutable access, reporting a stale handle as an error.
    pub fn try_get_mut(&mut self, handle: Handle) -> Result<&mut T> {
        self.get_mut(handle).ok_or_else(|| handle.stale())
    }

    /// Mutable access to two distinct entries at once.
    ///
    /// Returns `None` if either handle is stale or both name the same slot.
    pub fn get2_mut(&mut self, a: Handle, b: Handle) -> Option<(&mut T, &mut T)> {
        if a.index == b.index || !self.contains(a) || !self.contains(b) {
            return None;
        }
        let (low, high, swapped) = if a.index < b.index {
            (a.index(), b.index(), false)
        } else {
            (b.index(), a.index(), true)
        };
        let (head, tail) = self.slots.split_at_mut(high);
        let (Slot::Occupied { value: first, .. }, Slot::Occupied { value: second, .. }) =
            (&mut head[low], &mut tail[0])
        else {
            return None;
        };
        if swapped {
            Some((second, first))
        } else {
            Some((first, second))
        }
    }

    /// Live entry at a raw slot index, with its current handle.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn get_by_index(&self, index: usize) -> Option<(Handle, &T)> {
        match self.slots.get(index)? {
            Slot::Occupied { generation, value } => Some((
                Handle {
                    index: index as u32,
                    generation: *generation,
                },
                value,
            )),
            Slot::Free { .. } => None,
        }
    }

    /// Iterate live entries in slot order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied { generation, value } => Some((
                    Handle {
                        index: index as u32,
                        generation: *generation,
                    },
                    value,
                )),
                Slot::Free { .. } => None,
            })
    }

    /// Iterate live entries mutably in slot order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied { generation, value } => Some((
                    Handle {
                        index: index as u32,
                        generation: *generation,
                    },
                    value,
                )),
                Slot::Free { .. } => None,
            })
    }

    /// Iterate live handles in slot order.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.iter().map(|(handle, _)| handle)
    }
}

/// Declare a typed handle wrapping [`Handle`].
macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $name(pub Handle);

        impl $name {
            /// Wrap a raw arena handle.
            #[must_use]
            pub const fn new(handle: Handle) -> Self {
                Self(handle)
            }

            /// The raw arena handle.
            #[must_use]
            pub const fn raw(self) -> Handle {
                self.0
            }

            /// Slot index.
            #[must_use]
            pub const fn index(self) -> usize {
                self.0.index()
            }

            /// The error reported when this handle no longer resolves.
            #[must_use]
            pub const fn stale(self) -> SimError {
                self.0.stale()
            }
        }

        impl From<Handle> for $name {
            fn from(handle: Handle) -> Self {
                Self(handle)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }
    };
}

typed_handle!(
    /// Handle of a rigid body registered in a physics world.
    BodyHandle,
    "Body"
);
typed_handle!(
    /// Handle of a constraint registered in a physics world.
    ConstraintHandle,
    "Constraint"
);
typed_handle!(
    /// Handle of a force generator or step handler.
    HookHandle,
    "Hook"
);
typed_handle!(
    /// Handle of an owner registered in a physics world.
    OwnerHandle,
    "Owner"
);
typed_handle!(
    /// Handle of a gas cell registered in a gas network.
    CellHandle,
    "Cell"
);
typed_handle!(
    /// Handle of a boundary registered in a gas network.
    BoundaryHandle,
    "Boundary"
);
