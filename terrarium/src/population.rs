use crate::creature::{Creature, CreatureSnapshot};
use crate::{Position, WorldSize};
use log::trace;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Stable handle for a creature. Removed creatures never alias a newer one.
    pub struct CreatureId;
}

/// Capacity-bounded set of live creatures keyed by generational ids.
#[derive(Clone, Debug)]
pub struct Population {
    creatures: SlotMap<CreatureId, Creature>,
    capacity: usize,
}

impl Population {
    pub fn new(capacity: usize) -> Self {
        Self {
            creatures: SlotMap::with_capacity_and_key(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn contains(&self, id: CreatureId) -> bool {
        self.creatures.contains_key(id)
    }

    pub fn get(&self, id: CreatureId) -> Option<&Creature> {
        self.creatures.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        self.creatures.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CreatureId, &Creature)> + Clone {
        self.creatures.iter()
    }

    /// Copies out the current ids so callers can mutate the population while
    /// walking them.
    pub fn ids(&self) -> Vec<CreatureId> {
        self.creatures.keys().collect()
    }

    /// Adds `creature` unless the population is full, in which case it is
    /// dropped and `None` is returned.
    pub fn insert(&mut self, creature: Creature) -> Option<CreatureId> {
        if self.is_full() {
            trace!("population full at {}, dropping creature", self.capacity);
            return None;
        }
        Some(self.creatures.insert(creature))
    }

    /// Removing an id that is already gone does nothing.
    pub fn remove(&mut self, id: CreatureId) -> Option<Creature> {
        self.creatures.remove(id)
    }

    pub fn find_nearby(
        &self,
        point: Position,
        excluding: Option<CreatureId>,
        radius: i32,
    ) -> Vec<(CreatureId, CreatureSnapshot)> {
        self.creatures
            .iter()
            .filter(|(id, _)| Some(*id) != excluding)
            .map(|(id, creature)| (id, creature.snapshot()))
            .filter(|(_, snapshot)| snapshot.position.is_within(point, radius))
            .collect()
    }
}

/// What an advancing creature can see: everyone else in the population.
pub struct Neighborhood<'a> {
    population: &'a Population,
    center: CreatureId,
    world_size: WorldSize,
}

impl<'a> Neighborhood<'a> {
    pub fn new(population: &'a Population, center: CreatureId, world_size: WorldSize) -> Self {
        Self {
            population,
            center,
            world_size,
        }
    }

    pub fn world_size(&self) -> WorldSize {
        self.world_size
    }

    pub fn nearby(&self, point: Position, radius: i32) -> Vec<(CreatureId, CreatureSnapshot)> {
        self.population
            .find_nearby(point, Some(self.center), radius)
    }
}
