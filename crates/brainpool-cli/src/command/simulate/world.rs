//! A toy foraging world for exercising the learning engine.
//!
//! Foragers live on a ring of cells, some holding food. Each tick every forager
//! executes its current action and burns energy; eating restores it. A forager
//! whose energy runs out starves, takes a large penalty, and respawns.
//!
//! Only the first [`Action::COUNT`] action indices mean anything here; the rest
//! are masked out so that networks with more outputs still behave.

use anyhow::Context as _;
use brainpool_agent::{BrainState, FeatureEncoder};
use rand::{Rng, distr::Distribution as _};
use rand_distr::Normal;

pub const RING_SIZE: usize = 32;

const BASE_COST: f32 = 0.02;
const MOVE_COST: f32 = 0.01;
const REST_RECOVERY: f32 = 0.015;
const BITE: f32 = 0.3;
const REGROWTH: f32 = 0.01;
const FOOD_DENSITY: f64 = 0.3;

const STARVATION_PENALTY: f32 = 5.0;
const DISCOVERY_BONUS: f32 = 0.2;
const RESOURCE_BONUS: f32 = 0.1;
const SUCCESS_BONUS: f32 = 0.05;
const FAILURE_PENALTY: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Idle,
    MoveLeft,
    MoveRight,
    Eat,
    Rest,
}

impl Action {
    pub const COUNT: usize = 5;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Idle),
            1 => Some(Self::MoveLeft),
            2 => Some(Self::MoveRight),
            3 => Some(Self::Eat),
            4 => Some(Self::Rest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Forager {
    position: usize,
    energy: f32,
    visited: Vec<bool>,
}

impl Forager {
    fn spawn<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let position = rng.random_range(0..RING_SIZE);
        let mut visited = vec![false; RING_SIZE];
        visited[position] = true;
        Self {
            position,
            energy: 1.0,
            visited,
        }
    }
}

/// What happened to one forager during [`World::apply`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub reward: f32,
    pub starved: bool,
}

#[derive(Debug, Clone)]
pub struct World {
    food: Vec<f32>,
    foragers: Vec<Forager>,
    noise: Normal<f32>,
}

impl World {
    pub fn new<R>(population: usize, reward_noise: f32, rng: &mut R) -> anyhow::Result<Self>
    where
        R: Rng + ?Sized,
    {
        let noise = Normal::new(0.0, reward_noise)
            .with_context(|| format!("Invalid reward noise: {reward_noise}"))?;
        let food = (0..RING_SIZE)
            .map(|_| if rng.random_bool(FOOD_DENSITY) { 1.0 } else { 0.0 })
            .collect();
        let foragers = (0..population).map(|_| Forager::spawn(rng)).collect();
        Ok(Self {
            food,
            foragers,
            noise,
        })
    }

    pub fn population(&self) -> usize {
        self.foragers.len()
    }

    pub fn total_food(&self) -> f32 {
        self.food.iter().sum()
    }

    fn cell(&self, position: usize, offset: isize) -> f32 {
        self.food[(position + RING_SIZE).wrapping_add_signed(offset) % RING_SIZE]
    }

    /// Encodes what `agent` can sense.
    ///
    /// The vector is shorter than the network's input; the network zero-pads it.
    #[expect(clippy::cast_precision_loss)]
    pub fn observe(&self, agent: usize, brain: &BrainState) -> Vec<f32> {
        let forager = &self.foragers[agent];
        let p = forager.position;
        let angle = std::f32::consts::TAU * p as f32 / RING_SIZE as f32;
        let habit = brain.recent_actions().distribution(Action::COUNT);
        let mut observation = vec![
            forager.energy,
            self.cell(p, 0),
            self.cell(p, -1),
            self.cell(p, 1),
            self.cell(p, -2),
            self.cell(p, 2),
            angle.sin(),
            angle.cos(),
        ];
        observation.extend(habit);
        observation.push(1.0);
        observation
    }

    /// Actions `agent` can meaningfully take, for a network with `action_count` outputs.
    pub fn valid_actions(&self, agent: usize, action_count: usize) -> Vec<bool> {
        let forager = &self.foragers[agent];
        (0..action_count)
            .map(|i| match Action::from_index(i) {
                Some(Action::Eat) => self.food[forager.position] > 0.0,
                Some(Action::Rest) => forager.energy < 1.0,
                Some(_) => true,
                None => false,
            })
            .collect()
    }

    /// Executes `action` for `agent` and returns the reward it earned.
    ///
    /// Unknown action indices act as [`Action::Idle`] but count as a failure.
    pub fn apply<R>(&mut self, agent: usize, action: usize, rng: &mut R) -> Outcome
    where
        R: Rng + ?Sized,
    {
        let noise = self.noise.sample(rng);
        let forager = &mut self.foragers[agent];
        let before = forager.energy;
        let mut success = true;
        let mut gained = 0.0;
        let mut discovered = false;

        forager.energy -= BASE_COST;
        match Action::from_index(action) {
            Some(Action::Idle) => {}
            Some(step @ (Action::MoveLeft | Action::MoveRight)) => {
                forager.energy -= MOVE_COST;
                forager.position = if step == Action::MoveLeft {
                    (forager.position + RING_SIZE - 1) % RING_SIZE
                } else {
                    (forager.position + 1) % RING_SIZE
                };
                discovered = !forager.visited[forager.position];
                forager.visited[forager.position] = true;
            }
            Some(Action::Eat) => {
                let food = &mut self.food[forager.position];
                gained = food.min(BITE);
                *food -= gained;
                forager.energy = (forager.energy + gained).min(1.0);
                success = gained > 0.0;
            }
            Some(Action::Rest) => {
                success = forager.energy < 1.0;
                forager.energy = (forager.energy + REST_RECOVERY).min(1.0);
            }
            None => success = false,
        }

        let mut reward = forager.energy - before + noise;
        if discovered {
            reward += DISCOVERY_BONUS;
        }
        reward += RESOURCE_BONUS * gained;
        reward += if success { SUCCESS_BONUS } else { -FAILURE_PENALTY };

        let starved = forager.energy <= 0.0;
        if starved {
            reward -= STARVATION_PENALTY;
            *forager = Forager::spawn(rng);
        }
        Outcome { reward, starved }
    }

    /// Lets food grow back a little everywhere.
    #[expect(clippy::cast_precision_loss)]
    pub fn regrow<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        for food in &mut self.food {
            if *food > 0.0 || rng.random_bool(FOOD_DENSITY / RING_SIZE as f64) {
                *food = (*food + REGROWTH).min(1.0);
            }
        }
    }

    /// The world as seen by the scheduler.
    pub fn view(&self, action_count: usize) -> WorldView<'_> {
        WorldView {
            world: self,
            action_count,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorldView<'a> {
    world: &'a World,
    action_count: usize,
}

impl FeatureEncoder for WorldView<'_> {
    fn encode(&self, agent: usize, brain: &BrainState) -> Vec<f32> {
        self.world.observe(agent, brain)
    }

    fn action_mask(&self, agent: usize, _brain: &BrainState) -> Option<Vec<bool>> {
        Some(self.world.valid_actions(agent, self.action_count))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn world(rng: &mut Pcg32) -> World {
        World::new(3, 0.0, rng).unwrap()
    }

    #[test]
    fn test_observation_layout() {
        let mut rng = Pcg32::seed_from_u64(1);
        let world = world(&mut rng);
        let brain = BrainState::new(4, 4);
        let observation = world.observe(0, &brain);
        assert_eq!(observation.len(), 8 + Action::COUNT + 1);
        assert_eq!(observation[0], 1.0);
        assert_eq!(observation.last(), Some(&1.0));
    }

    #[test]
    fn test_unknown_actions_are_masked() {
        let mut rng = Pcg32::seed_from_u64(2);
        let world = world(&mut rng);
        let valid = world.valid_actions(0, 14);
        assert_eq!(valid.len(), 14);
        assert!(valid[0] && valid[1] && valid[2]);
        assert!(!valid[4], "full energy cannot rest");
        assert!(valid[Action::COUNT..].iter().all(|v| !v));
    }

    #[test]
    fn test_idling_costs_energy() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut world = world(&mut rng);
        let outcome = world.apply(0, 0, &mut rng);
        assert!(!outcome.starved);
        assert!((outcome.reward - (SUCCESS_BONUS - BASE_COST)).abs() < 1e-6);
    }

    #[test]
    fn test_foragers_starve_and_respawn() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut world = world(&mut rng);
        let mut starved = false;
        for _ in 0..100 {
            let outcome = world.apply(1, 0, &mut rng);
            if outcome.starved {
                assert!(outcome.reward < -STARVATION_PENALTY + 1.0);
                starved = true;
                break;
            }
        }
        assert!(starved);
        assert_eq!(world.foragers[1].energy, 1.0);
    }

    #[test]
    fn test_eating_consumes_food() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut world = world(&mut rng);
        let p = world.foragers[0].position;
        world.food[p] = 1.0;
        world.foragers[0].energy = 0.5;
        let outcome = world.apply(0, 3, &mut rng);
        assert!((world.food[p] - (1.0 - BITE)).abs() < 1e-6);
        assert!(outcome.reward > 0.0);
    }
}
