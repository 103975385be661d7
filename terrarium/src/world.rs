use crate::creature::{Creature, CreatureSnapshot, Effect};
use crate::population::{CreatureId, Neighborhood, Population};
use crate::{INITIAL_POPULATION, MAX_POPULATION, Position, Random, Surface, WorldSize};
use log::{info, trace};

/// Counts of what happened during one render pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSummary {
    pub advanced: usize,
    pub births: usize,
    pub deaths: usize,
    pub dropped: usize,
    pub population: usize,
}

/// The world: a bounded population of creatures, painted onto a bound
/// surface. Every rendered frame advances each live creature once.
#[derive(Debug)]
pub struct Terrarium<S> {
    size: WorldSize,
    population: Population,
    surface: Option<S>,
    rand: Random,
}

impl<S: Surface> Terrarium<S> {
    pub fn new(size: WorldSize, rand: Random) -> Self {
        Self::with_population(size, INITIAL_POPULATION, rand)
    }

    pub fn with_population(size: WorldSize, count: usize, rand: Random) -> Self {
        let mut result = Self::new_empty(size, rand);
        result.seed(count);
        info!(
            "seeded {} creatures in a {}x{} terrarium",
            result.population.len(),
            size.width,
            size.height
        );
        result
    }

    pub fn new_empty(size: WorldSize, rand: Random) -> Self {
        assert!(size.width > 0 && size.height > 0);
        Self {
            size,
            population: Population::new(MAX_POPULATION),
            surface: None,
            rand,
        }
    }

    fn seed(&mut self, count: usize) {
        for _ in 0..count {
            let position = self.random_position();
            let creature = Creature::random(position, &mut self.rand);
            if self.population.insert(creature).is_none() {
                break;
            }
        }
    }

    fn random_position(&mut self) -> Position {
        let x = self.rand.next_in_range(0..self.size.width as i32);
        let y = self.rand.next_in_range(0..self.size.height as i32);
        Position::new(x, y)
    }

    pub fn size(&self) -> WorldSize {
        self.size
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn creature(&self, id: CreatureId) -> Option<&Creature> {
        self.population.get(id)
    }

    pub fn snapshots(&self) -> impl Iterator<Item = CreatureSnapshot> + '_ {
        self.population
            .iter()
            .map(|(_, creature)| creature.snapshot())
    }

    /// Replaces any previously bound surface, returning it.
    pub fn bind_surface(&mut self, surface: S) -> Option<S> {
        self.surface.replace(surface)
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    /// Does nothing until a surface is bound. Creatures spawned during the
    /// pass wait for the next frame; creatures eaten earlier in the pass are
    /// skipped.
    pub fn render_frame(&mut self) -> FrameSummary {
        let mut summary = FrameSummary::default();
        match self.surface.as_mut() {
            Some(surface) => surface.clear(self.size.width, self.size.height),
            None => return summary,
        }

        for id in self.population.ids() {
            if let Some(snapshot) = self.step(id, &mut summary)
                && let Some(surface) = self.surface.as_mut()
            {
                let Position { x, y } = snapshot.position;
                surface.fill_square(x, y, snapshot.half_size(), snapshot.color);
            }
        }

        summary.population = self.population.len();
        summary
    }

    pub fn find_nearby(
        &self,
        point: Position,
        excluding: Option<CreatureId>,
        radius: i32,
    ) -> Vec<(CreatureId, CreatureSnapshot)> {
        self.population.find_nearby(point, excluding, radius)
    }

    /// Dropped without complaint when the population is full.
    pub fn add_creature(&mut self, creature: Creature) -> Option<CreatureId> {
        self.population.insert(creature)
    }

    pub fn remove_creature(&mut self, id: CreatureId) -> Option<Creature> {
        self.population.remove(id)
    }

    /// Advances a single creature and applies its effects without painting.
    pub fn advance_creature(&mut self, id: CreatureId) -> FrameSummary {
        let mut summary = FrameSummary::default();
        self.step(id, &mut summary);
        summary.population = self.population.len();
        summary
    }

    /// Returns what the creature looked like after its step, even if the
    /// step killed it.
    fn step(&mut self, id: CreatureId, summary: &mut FrameSummary) -> Option<CreatureSnapshot> {
        let mut creature = self.population.get(id)?.clone();
        let neighborhood = Neighborhood::new(&self.population, id, self.size);
        let effects = creature.advance(&neighborhood, &mut self.rand);
        let snapshot = creature.snapshot();

        if let Some(stored) = self.population.get_mut(id) {
            *stored = creature;
        }
        summary.advanced += 1;

        for effect in effects {
            self.apply(id, effect, summary);
        }
        Some(snapshot)
    }

    fn apply(&mut self, id: CreatureId, effect: Effect, summary: &mut FrameSummary) {
        match effect {
            Effect::Die => {
                if self.population.remove(id).is_some() {
                    trace!("{id:?} died");
                    summary.deaths += 1;
                }
            }
            Effect::Eat(target) => {
                if self.population.remove(target).is_some() {
                    trace!("{id:?} ate {target:?}");
                    summary.deaths += 1;
                }
            }
            Effect::Spawn(offspring) => match self.population.insert(offspring) {
                Some(child) => {
                    trace!("{id:?} spawned {child:?}");
                    summary.births += 1;
                }
                None => summary.dropped += 1,
            },
        }
    }
}
