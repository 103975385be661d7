use crate::population::{CreatureId, Neighborhood};
use crate::{Position, Random, WorldSize};
use arrayvec::ArrayVec;
use std::rc::Rc;

pub const DEFAULT_TAPE_LENGTH: usize = 64;

/// Lifecycle changes an advancing creature asks its terrarium to apply, in
/// order. At most: die, then two spawns.
pub type Effects = ArrayVec<Effect, 4>;

#[derive(Clone, Debug)]
pub enum Effect {
    Die,
    Eat(CreatureId),
    Spawn(Creature),
}

/// What the terrarium needs to paint a creature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreatureSnapshot {
    pub position: Position,
    pub size: i32,
    pub color: [u8; 3],
}

impl CreatureSnapshot {
    pub fn half_size(&self) -> f32 {
        self.size as f32 / 2.0
    }
}

#[derive(Clone, Debug)]
pub struct Creature {
    position: Position,
    heading: Heading,
    size: i32,
    color: [u8; 3],
    tape: Tape,
    tick: u64,
}

impl Creature {
    const AGING_PERIOD: u64 = 40;
    const MAX_SIZE: i32 = 10;
    const GROWTH_LIMIT: i32 = 5;
    const GROWTH_TAX: u64 = 4;
    const SPLIT_MIN_SIZE: i32 = 3;
    const SPLIT_TAX: u64 = 4;
    const FEED_RADIUS: i32 = 2;
    const CROWDING_RADIUS: i32 = 3;
    const CROWDING_LIMIT: usize = 3;

    pub fn new(position: Position, size: i32, color: [u8; 3], tape: Tape) -> Self {
        Self {
            position,
            heading: Heading::default(),
            size,
            color,
            tape,
            tick: 0,
        }
    }

    pub fn random(position: Position, rand: &mut Random) -> Self {
        let color = rand.next_color_rgb();
        let tape = Tape::random(DEFAULT_TAPE_LENGTH, rand);
        Self::new(position, 1, color, tape)
    }

    pub fn with_heading(mut self, heading: Heading) -> Self {
        self.heading = heading;
        self
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn color(&self) -> [u8; 3] {
        self.color
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn snapshot(&self) -> CreatureSnapshot {
        CreatureSnapshot {
            position: self.position,
            size: self.size,
            color: self.color,
        }
    }

    pub fn has_viable_size(&self) -> bool {
        (1..=Self::MAX_SIZE).contains(&self.size)
    }

    /// Runs one instruction from the tape. Size is checked before the
    /// instruction runs, and a creature that is already dying still carries
    /// out its instruction.
    pub fn advance(&mut self, neighborhood: &Neighborhood, rand: &mut Random) -> Effects {
        let mut effects = Effects::new();

        self.tick += 1;
        if self.tick % Self::AGING_PERIOD == 0 {
            self.size -= 1;
        }
        if !self.has_viable_size() {
            Self::push_death(&mut effects);
        }

        match self.tape.instruction_at(self.tick) {
            Instruction::Forward => self.move_forward(),
            Instruction::TurnLeft => self.heading = self.heading.turned_left(),
            Instruction::TurnRight => self.heading = self.heading.turned_right(),
            Instruction::Feed => self.feed(neighborhood, &mut effects),
            Instruction::Reverse => {
                self.heading = self.heading.turned_left().turned_left();
                self.move_forward();
            }
            Instruction::Grow => self.grow(),
            Instruction::Split { dx, dy } => {
                if neighborhood.nearby(self.position, Self::CROWDING_RADIUS).len()
                    < Self::CROWDING_LIMIT
                {
                    self.split(dx, dy, false, neighborhood.world_size(), rand, &mut effects);
                }
            }
            Instruction::Idle => {}
        }

        self.position = self.position.wrapped(neighborhood.world_size());
        effects
    }

    fn move_forward(&mut self) {
        let (dx, dy) = self.heading.step();
        self.position = self.position.offset(dx, dy);
    }

    fn grow(&mut self) {
        if self.size < Self::GROWTH_LIMIT {
            self.size += 1;
            self.tick += Self::GROWTH_TAX;
        }
    }

    fn feed(&mut self, neighborhood: &Neighborhood, effects: &mut Effects) {
        let found = neighborhood.nearby(self.position, Self::FEED_RADIUS);
        if let Some(&(target, prey)) = found.first() {
            self.size += prey.size;
            effects.push(Effect::Eat(target));
        }
    }

    /// Replaces this creature with two half-size offspring: one shifted by
    /// `(dx, dy)` carrying the same tape, one in place carrying a copy that
    /// may be reversed and mutated. The tick tax applies even when the
    /// creature is too small to split.
    pub(crate) fn split(
        &mut self,
        dx: i32,
        dy: i32,
        reverse: bool,
        world_size: WorldSize,
        rand: &mut Random,
        effects: &mut Effects,
    ) {
        if self.size >= Self::SPLIT_MIN_SIZE {
            let half = self.size / 2;
            Self::push_death(effects);

            let shifted = self.position.offset(dx, dy).wrapped(world_size);
            effects.push(Effect::Spawn(Creature::new(
                shifted,
                half,
                self.color,
                self.tape.clone(),
            )));

            let mutated = self.tape.mutated(reverse, rand);
            effects.push(Effect::Spawn(Creature::new(
                self.position,
                half,
                self.color,
                mutated,
            )));
        }
        self.tick += Self::SPLIT_TAX;
    }

    fn push_death(effects: &mut Effects) {
        if !effects.iter().any(|effect| matches!(effect, Effect::Die)) {
            effects.push(Effect::Die);
        }
    }
}

/// Five-state heading register. Only four states move; `Stalled` makes
/// forward moves no-ops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Heading {
    #[default]
    East,
    South,
    West,
    North,
    Stalled,
}

impl Heading {
    const ALL: [Heading; 5] = [
        Heading::East,
        Heading::South,
        Heading::West,
        Heading::North,
        Heading::Stalled,
    ];

    pub fn turned_left(self) -> Self {
        Self::ALL[(self as usize + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn turned_right(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }

    pub fn step(self) -> (i32, i32) {
        match self {
            Heading::East => (1, 0),
            Heading::South => (0, 1),
            Heading::West => (-1, 0),
            Heading::North => (0, -1),
            Heading::Stalled => (0, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    Idle,
    Forward,
    TurnLeft,
    TurnRight,
    Feed,
    Reverse,
    Grow,
    Split { dx: i32, dy: i32 },
}

impl Instruction {
    pub fn decode(code: u8) -> Self {
        match code {
            1 => Instruction::Forward,
            2 => Instruction::TurnLeft,
            3 => Instruction::TurnRight,
            4 => Instruction::Feed,
            5 => Instruction::Reverse,
            6 => Instruction::Grow,
            7 => Instruction::Split { dx: 0, dy: -3 },
            8 => Instruction::Split { dx: 0, dy: 3 },
            9 => Instruction::Split { dx: 3, dy: 0 },
            10 => Instruction::Split { dx: -3, dy: 0 },
            _ => Instruction::Idle,
        }
    }
}

/// Immutable instruction codes, read cyclically. Clones share storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tape {
    codes: Rc<[u8]>,
}

impl Tape {
    /// Fresh tapes never contain the highest code; only mutation produces it.
    const RANDOM_CODES: std::ops::Range<u8> = 0..15;
    const MUTATION_CODES: std::ops::RangeInclusive<u8> = 0..=15;
    const MUTATION_ODDS: f64 = 0.2;

    pub fn new(codes: Vec<u8>) -> Self {
        Self {
            codes: codes.into(),
        }
    }

    pub fn random(len: usize, rand: &mut Random) -> Self {
        let codes = (0..len)
            .map(|_| rand.next_in_range(Self::RANDOM_CODES))
            .collect();
        Self::new(codes)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn codes(&self) -> &[u8] {
        &self.codes
    }

    /// An empty tape idles forever.
    pub fn instruction_at(&self, tick: u64) -> Instruction {
        if self.is_empty() {
            return Instruction::Idle;
        }
        let index = (tick % self.codes.len() as u64) as usize;
        Instruction::decode(self.codes[index])
    }

    pub fn mutated(&self, reverse: bool, rand: &mut Random) -> Tape {
        let mut codes = self.codes.to_vec();
        if reverse {
            codes.reverse();
        }
        if !codes.is_empty() && rand.next_bool(Self::MUTATION_ODDS) {
            let index = rand.next_in_range(0..codes.len());
            codes[index] = rand.next_in_range(Self::MUTATION_CODES);
        }
        Self::new(codes)
    }

    pub fn shares_codes_with(&self, other: &Tape) -> bool {
        Rc::ptr_eq(&self.codes, &other.codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Population;

    const SIZE: WorldSize = WorldSize {
        width: 100,
        height: 80,
    };

    fn repeated(code: u8) -> Tape {
        Tape::new(vec![code; 8])
    }

    /// Advances the creature stored under `id` against the rest of `population`.
    fn advance(population: &mut Population, id: CreatureId, rand: &mut Random) -> Effects {
        let mut creature = population.get(id).unwrap().clone();
        let effects = creature.advance(&Neighborhood::new(population, id, SIZE), rand);
        *population.get_mut(id).unwrap() = creature;
        effects
    }

    fn alone(creature: Creature) -> (Population, CreatureId) {
        let mut population = Population::new(16);
        let id = population.insert(creature).unwrap();
        (population, id)
    }

    #[test]
    fn decodes_every_code() {
        assert_eq!(Instruction::decode(0), Instruction::Idle);
        assert_eq!(Instruction::decode(1), Instruction::Forward);
        assert_eq!(Instruction::decode(5), Instruction::Reverse);
        assert_eq!(Instruction::decode(7), Instruction::Split { dx: 0, dy: -3 });
        assert_eq!(Instruction::decode(10), Instruction::Split { dx: -3, dy: 0 });
        for code in 11..=15 {
            assert_eq!(Instruction::decode(code), Instruction::Idle);
        }
    }

    #[test]
    fn heading_cycles_through_five_states() {
        assert_eq!(Heading::East.turned_left(), Heading::Stalled);
        assert_eq!(Heading::Stalled.turned_right(), Heading::East);
        let mut heading = Heading::East;
        for _ in 0..5 {
            heading = heading.turned_right();
        }
        assert_eq!(heading, Heading::East);
    }

    #[test]
    fn stalled_heading_does_not_move() {
        let creature =
            Creature::new(Position::new(5, 5), 1, [0; 3], repeated(1)).with_heading(Heading::Stalled);
        let (mut population, id) = alone(creature);
        advance(&mut population, id, &mut Random::seeded(1));
        assert_eq!(population.get(id).unwrap().position(), Position::new(5, 5));
    }

    #[test]
    fn forward_past_right_edge_lands_at_zero() {
        let creature = Creature::new(Position::new(SIZE.width as i32 - 1, 5), 1, [0; 3], repeated(1));
        let (mut population, id) = alone(creature);
        advance(&mut population, id, &mut Random::seeded(1));
        assert_eq!(population.get(id).unwrap().position(), Position::new(0, 5));
    }

    #[test]
    fn reverse_turns_twice_then_steps() {
        let creature = Creature::new(Position::new(5, 0), 1, [0; 3], repeated(5));
        let (mut population, id) = alone(creature);
        advance(&mut population, id, &mut Random::seeded(1));

        // East turned left twice is North; the step off the top edge wraps.
        let creature = population.get(id).unwrap();
        assert_eq!(creature.heading(), Heading::North);
        assert_eq!(creature.position(), Position::new(5, SIZE.height as i32 - 1));
    }

    #[test]
    fn grow_pays_tick_tax_until_limit() {
        let creature = Creature::new(Position::new(5, 5), 4, [0; 3], repeated(6));
        let (mut population, id) = alone(creature);
        let mut rand = Random::seeded(1);

        advance(&mut population, id, &mut rand);
        let creature = population.get(id).unwrap();
        assert_eq!(creature.size(), 5);
        assert_eq!(creature.tick(), 5);

        advance(&mut population, id, &mut rand);
        let creature = population.get(id).unwrap();
        assert_eq!(creature.size(), 5);
        assert_eq!(creature.tick(), 6);
    }

    #[test]
    fn ages_every_fortieth_tick() {
        let (mut population, id) = alone(Creature::new(Position::new(5, 5), 3, [0; 3], repeated(0)));
        let mut rand = Random::seeded(1);
        for _ in 0..39 {
            advance(&mut population, id, &mut rand);
        }
        assert_eq!(population.get(id).unwrap().size(), 3);
        advance(&mut population, id, &mut rand);
        assert_eq!(population.get(id).unwrap().size(), 2);
    }

    #[test]
    fn oversized_creature_dies_but_still_acts() {
        let creature = Creature::new(Position::new(5, 5), 11, [0; 3], repeated(1));
        let (mut population, id) = alone(creature);
        let effects = advance(&mut population, id, &mut Random::seeded(1));

        assert!(matches!(effects.as_slice(), [Effect::Die]));
        assert_eq!(population.get(id).unwrap().position(), Position::new(6, 5));
    }

    #[test]
    fn feed_eats_first_neighbor() {
        let mut population = Population::new(4);
        let hunter = population
            .insert(Creature::new(Position::new(5, 5), 6, [0; 3], repeated(4)))
            .unwrap();
        let prey = population
            .insert(Creature::new(Position::new(6, 5), 1, [0; 3], repeated(0)))
            .unwrap();

        let effects = advance(&mut population, hunter, &mut Random::seeded(1));
        assert!(matches!(effects.as_slice(), [Effect::Eat(target)] if *target == prey));
        assert_eq!(population.get(hunter).unwrap().size(), 7);
    }

    #[test]
    fn feed_without_neighbors_does_nothing() {
        let mut population = Population::new(4);
        let hunter = population
            .insert(Creature::new(Position::new(5, 5), 6, [0; 3], repeated(4)))
            .unwrap();
        population.insert(Creature::new(Position::new(7, 5), 1, [0; 3], repeated(0)));

        let effects = advance(&mut population, hunter, &mut Random::seeded(1));
        assert!(effects.is_empty());
        assert_eq!(population.get(hunter).unwrap().size(), 6);
    }

    #[test]
    fn split_replaces_parent_with_two_halves() {
        let tape = Tape::new(vec![9; 4]);
        let (mut population, id) = alone(Creature::new(Position::new(10, 10), 7, [1, 2, 3], tape.clone()));
        let effects = advance(&mut population, id, &mut Random::seeded(1));

        let [Effect::Die, Effect::Spawn(shifted), Effect::Spawn(in_place)] = effects.as_slice() else {
            panic!("unexpected effects {effects:?}");
        };
        assert_eq!(shifted.position(), Position::new(13, 10));
        assert_eq!(in_place.position(), Position::new(10, 10));
        assert_eq!(shifted.size(), 3);
        assert_eq!(in_place.size(), 3);
        assert_eq!(shifted.color(), [1, 2, 3]);
        assert!(shifted.tape().shares_codes_with(&tape));
        assert_eq!(in_place.tape().len(), tape.len());
        assert_eq!(shifted.tick(), 0);
        assert_eq!(shifted.heading(), Heading::East);
    }

    #[test]
    fn split_is_suppressed_when_crowded() {
        let mut population = Population::new(8);
        let id = population
            .insert(Creature::new(Position::new(10, 10), 8, [0; 3], repeated(7)))
            .unwrap();
        for x in [9, 10, 11] {
            population.insert(Creature::new(Position::new(x, 11), 1, [0; 3], repeated(0)));
        }

        let effects = advance(&mut population, id, &mut Random::seeded(1));
        assert!(effects.is_empty());
        assert_eq!(population.get(id).unwrap().tick(), 1);
    }

    #[test]
    fn small_creature_still_pays_split_tax() {
        let (mut population, id) = alone(Creature::new(Position::new(10, 10), 2, [0; 3], repeated(8)));
        let effects = advance(&mut population, id, &mut Random::seeded(1));

        assert!(effects.is_empty());
        assert_eq!(population.get(id).unwrap().tick(), 5);
    }

    #[test]
    fn dying_creature_splits_with_single_death() {
        let (mut population, id) = alone(Creature::new(Position::new(10, 10), 11, [0; 3], repeated(10)));
        let effects = advance(&mut population, id, &mut Random::seeded(1));

        let deaths = effects.iter().filter(|effect| matches!(effect, Effect::Die)).count();
        assert_eq!(deaths, 1);
        assert_eq!(effects.len(), 3);
    }

    #[test]
    fn shifted_offspring_is_wrapped() {
        let mut creature = Creature::new(Position::new(1, 10), 4, [0; 3], repeated(0));
        let mut effects = Effects::new();
        creature.split(-3, 0, false, SIZE, &mut Random::seeded(1), &mut effects);

        let Some(Effect::Spawn(shifted)) = effects.get(1) else {
            panic!("unexpected effects {effects:?}");
        };
        assert_eq!(shifted.position(), Position::new(SIZE.width as i32 - 1, 10));
    }

    #[test]
    fn reversed_split_reverses_mutated_tape() {
        let tape = Tape::new((0..16).collect());
        let mut creature = Creature::new(Position::new(10, 10), 4, [0; 3], tape);
        let mut effects = Effects::new();
        creature.split(3, 0, true, SIZE, &mut Random::seeded(3), &mut effects);

        let Some(Effect::Spawn(in_place)) = effects.get(2) else {
            panic!("unexpected effects {effects:?}");
        };
        let reversed: Vec<u8> = (0..16).rev().collect();
        let differing = in_place
            .tape()
            .codes()
            .iter()
            .zip(&reversed)
            .filter(|(a, b)| a != b)
            .count();
        assert!(differing <= 1);
    }

    #[test]
    fn random_tape_avoids_top_code() {
        let tape = Tape::random(DEFAULT_TAPE_LENGTH, &mut Random::seeded(11));
        assert_eq!(tape.len(), DEFAULT_TAPE_LENGTH);
        assert!(tape.codes().iter().all(|&code| code < 15));
    }

    #[test]
    fn mutation_touches_at_most_one_slot() {
        let tape = Tape::new(vec![0; 32]);
        let mut rand = Random::seeded(5);
        for _ in 0..50 {
            let mutated = tape.mutated(false, &mut rand);
            assert_eq!(mutated.len(), 32);
            assert!(!mutated.shares_codes_with(&tape));
            let changed = mutated.codes().iter().filter(|&&code| code != 0).count();
            assert!(changed <= 1);
            assert!(mutated.codes().iter().all(|&code| code <= 15));
        }
    }

    #[test]
    fn mutation_rate_is_one_in_five() {
        let tape = Tape::new(vec![0; 32]);
        let mut rand = Random::seeded(99);
        let draws = 10_000;
        let mut changed = 0;
        let mut saw_top_code = false;
        for _ in 0..draws {
            let mutated = tape.mutated(false, &mut rand);
            if let Some(&code) = mutated.codes().iter().find(|&&code| code != 0) {
                changed += 1;
                saw_top_code |= code == 15;
            }
        }

        // A mutation that rewrites the slot to 0 leaves no trace: 0.2 * 15/16.
        let rate = changed as f64 / draws as f64;
        assert!((0.17..0.21).contains(&rate), "mutation rate {rate}");
        assert!(saw_top_code);
    }

    #[test]
    fn first_advance_reads_second_slot() {
        let (mut population, id) =
            alone(Creature::new(Position::new(5, 5), 1, [0; 3], Tape::new(vec![1, 0])));
        let mut rand = Random::seeded(1);

        advance(&mut population, id, &mut rand);
        assert_eq!(population.get(id).unwrap().position(), Position::new(5, 5));

        advance(&mut population, id, &mut rand);
        assert_eq!(population.get(id).unwrap().position(), Position::new(6, 5));
    }

    #[test]
    fn empty_tape_idles() {
        let tape = Tape::new(Vec::new());
        assert_eq!(tape.instruction_at(17), Instruction::Idle);
        assert!(tape.mutated(true, &mut Random::seeded(1)).is_empty());
    }
}
