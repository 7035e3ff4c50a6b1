//! Append-only entity arena.
//!
//! Every soldier, king, unit, tower and dragonfly lives in one growable
//! [`EntityStore`] and is addressed by a [`Ref`]. Slots are never removed or
//! reordered, so a handle keeps naming the same logical entity for the whole
//! battle (and across a serialize/deserialize round trip). Death is modelled
//! by health and by list membership, not by deleting slots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::components::{BannerTower, Dragonfly, King, Soldier, Unit};
use crate::error::{Result, SimError};

/// Stable handle naming one arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ref(pub u32);

impl Ref {
    /// Slot index in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discriminant of [`Entity`], used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A spear soldier.
    Soldier,
    /// A faction king.
    King,
    /// A formation of soldiers.
    Unit,
    /// A capturable strongpoint.
    BannerTower,
    /// A mountable flyer.
    Dragonfly,
}

/// One arena slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    /// A spear soldier.
    Soldier(Soldier),
    /// A faction king.
    King(King),
    /// A formation of soldiers.
    Unit(Unit),
    /// A capturable strongpoint.
    BannerTower(BannerTower),
    /// A mountable flyer.
    Dragonfly(Dragonfly),
}

impl Entity {
    /// Kind of this entity.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Soldier(_) => EntityKind::Soldier,
            Self::King(_) => EntityKind::King,
            Self::Unit(_) => EntityKind::Unit,
            Self::BannerTower(_) => EntityKind::BannerTower,
            Self::Dragonfly(_) => EntityKind::Dragonfly,
        }
    }
}

macro_rules! typed_access {
    ($try_get:ident, $try_get_mut:ident, $get:ident, $get_mut:ident, $variant:ident, $ty:ty) => {
        #[doc = concat!("Look up a [`", stringify!($ty), "`].")]
        pub fn $try_get(&self, handle: Ref) -> Result<&$ty> {
            match self.get(handle)? {
                Entity::$variant(value) => Ok(value),
                other => Err(mismatch(handle, EntityKind::$variant, other)),
            }
        }

        #[doc = concat!("Look up a [`", stringify!($ty), "`] mutably.")]
        pub fn $try_get_mut(&mut self, handle: Ref) -> Result<&mut $ty> {
            match self.get_mut(handle)? {
                Entity::$variant(value) => Ok(value),
                other => Err(mismatch(handle, EntityKind::$variant, other)),
            }
        }

        #[doc = concat!("Dereference a handle known to name a [`", stringify!($ty), "`].")]
        ///
        /// # Panics
        ///
        /// Panics if the handle is out of range or names another kind.
        #[track_caller]
        pub fn $get(&self, handle: Ref) -> &$ty {
            self.$try_get(handle).unwrap_or_else(|e| panic!("{e}"))
        }

        #[doc = concat!("Mutably dereference a handle known to name a [`", stringify!($ty), "`].")]
        ///
        /// # Panics
        ///
        /// Panics if the handle is out of range or names another kind.
        #[track_caller]
        pub fn $get_mut(&mut self, handle: Ref) -> &mut $ty {
            self.$try_get_mut(handle).unwrap_or_else(|e| panic!("{e}"))
        }
    };
}

fn mismatch(handle: Ref, expected: EntityKind, actual: &Entity) -> SimError {
    SimError::KindMismatch {
        handle,
        expected,
        actual: actual.kind(),
    }
}

/// Storage for all entities in the battle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityStore {
    entities: Vec<Entity>,
}

impl EntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity and return its handle.
    pub fn add(&mut self, entity: impl Into<Entity>) -> Ref {
        let handle = Ref(u32::try_from(self.entities.len()).unwrap_or_else(|_| {
            panic!("entity arena exceeded {} slots", u32::MAX)
        }));
        self.entities.push(entity.into());
        handle
    }

    /// Look up any entity.
    pub fn get(&self, handle: Ref) -> Result<&Entity> {
        self.entities
            .get(handle.index())
            .ok_or(SimError::InvalidHandle(handle))
    }

    /// Look up any entity mutably.
    pub fn get_mut(&mut self, handle: Ref) -> Result<&mut Entity> {
        self.entities
            .get_mut(handle.index())
            .ok_or(SimError::InvalidHandle(handle))
    }

    /// Number of slots ever allocated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over every slot in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (Ref, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, entity)| (Ref(i as u32), entity))
    }

    typed_access!(try_unit, try_unit_mut, unit, unit_mut, Unit, Unit);
    typed_access!(try_king, try_king_mut, king, king_mut, King, King);
    typed_access!(
        try_tower,
        try_tower_mut,
        tower,
        tower_mut,
        BannerTower,
        BannerTower
    );
    typed_access!(
        try_dragonfly,
        try_dragonfly_mut,
        dragonfly,
        dragonfly_mut,
        Dragonfly,
        Dragonfly
    );

    /// Look up the soldier part of a soldier or king.
    ///
    /// Kings are soldiers with extra fields, so attack targets may name either.
    pub fn try_soldier(&self, handle: Ref) -> Result<&Soldier> {
        match self.get(handle)? {
            Entity::Soldier(soldier) => Ok(soldier),
            Entity::King(king) => Ok(&king.soldier),
            other => Err(mismatch(handle, EntityKind::Soldier, other)),
        }
    }

    /// Mutable form of [`try_soldier`](Self::try_soldier).
    pub fn try_soldier_mut(&mut self, handle: Ref) -> Result<&mut Soldier> {
        match self.get_mut(handle)? {
            Entity::Soldier(soldier) => Ok(soldier),
            Entity::King(king) => Ok(&mut king.soldier),
            other => Err(mismatch(handle, EntityKind::Soldier, other)),
        }
    }

    /// Dereference a handle known to name a soldier or king.
    ///
    /// # Panics
    ///
    /// Panics if the handle is out of range or names another kind.
    #[track_caller]
    pub fn soldier(&self, handle: Ref) -> &Soldier {
        self.try_soldier(handle).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Mutable form of [`soldier`](Self::soldier).
    ///
    /// # Panics
    ///
    /// Panics if the handle is out of range or names another kind.
    #[track_caller]
    pub fn soldier_mut(&mut self, handle: Ref) -> &mut Soldier {
        self.try_soldier_mut(handle).unwrap_or_else(|e| panic!("{e}"))
    }
}

macro_rules! into_entity {
    ($($ty:ident),*) => {
        $(impl From<$ty> for Entity {
            fn from(value: $ty) -> Self {
                Self::$ty(value)
            }
        })*
    };
}

into_entity!(Soldier, King, Unit, BannerTower, Dragonfly);
