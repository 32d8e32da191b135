use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    economy::{self, FERTILIZER_CHARGES},
    growth,
    rarity::{self, PlantType, Rarity},
};
use crate::error::{GardenError, GardenResult};

/// Growth stage. Stored as SMALLINT, serialized as its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(into = "i16", try_from = "i16")]
#[repr(i16)]
pub enum Stage {
    Seed = 0,
    Sprout = 1,
    Grown = 2,
}

impl From<Stage> for i16 {
    fn from(stage: Stage) -> Self {
        stage as i16
    }
}

impl TryFrom<i16> for Stage {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Stage::Seed),
            1 => Ok(Stage::Sprout),
            2 => Ok(Stage::Grown),
            other => Err(format!("invalid stage {other}")),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i16::from(*self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> GardenResult<Self> {
        if x < 0 || y < 0 {
            return Err(GardenError::Validation(format!(
                "coordinates must be non-negative, got ({x}, {y})"
            )));
        }
        Ok(Self { x, y })
    }
}

/// A plant row. Every mutation goes through the methods below, which keep the
/// stage/timer/gate fields consistent:
/// seed: timer set, fertilizer null; sprout: timer set, fertilizer >= 0;
/// grown: both null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Plant {
    pub plant_id: Uuid,
    #[serde(skip_serializing)]
    pub owner_email: String,
    pub plant_type: PlantType,
    pub plant_species: String,
    pub rarity: Rarity,
    pub size: i32,
    pub x: i32,
    pub y: i32,
    pub stage: Stage,
    pub watered: bool,
    pub growth_time_remaining: Option<i32>,
    pub fertilizer_remaining: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// What a single grow tick did to a plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    /// Timer still running.
    Waiting,
    /// Timer done but the water/fertilizer gate is closed.
    Stalled,
    Advanced(Stage),
    /// Already fully grown; nothing to do.
    Mature,
}

impl Plant {
    /// A freshly bought seed with a drawn rarity and species.
    pub fn seed<R: Rng + ?Sized>(
        owner_email: &str,
        plant_type: PlantType,
        position: Position,
        now: OffsetDateTime,
        rng: &mut R,
    ) -> Self {
        let rarity = rarity::draw_rarity(rng);
        let species = rarity::species_for(plant_type, rarity, rng);
        Self {
            plant_id: Uuid::new_v4(),
            owner_email: owner_email.to_string(),
            plant_type,
            plant_species: species.to_string(),
            rarity,
            size: 1,
            x: position.x,
            y: position.y,
            stage: Stage::Seed,
            watered: false,
            growth_time_remaining: Some(growth::initial_stage0_duration()),
            fertilizer_remaining: None,
            created_at: now,
        }
    }

    pub fn apply_water(&mut self) -> GardenResult<()> {
        if self.stage != Stage::Seed {
            return Err(GardenError::InvalidStage {
                action: "water",
                stage: self.stage,
            });
        }
        self.watered = true;
        Ok(())
    }

    pub fn apply_fertilizer(&mut self) -> GardenResult<()> {
        if self.stage != Stage::Sprout {
            return Err(GardenError::InvalidStage {
                action: "fertilize",
                stage: self.stage,
            });
        }
        let charges = self.fertilizer_remaining.unwrap_or(0);
        self.fertilizer_remaining = Some(charges.saturating_add(FERTILIZER_CHARGES));
        Ok(())
    }

    fn gate_open(&self) -> bool {
        match self.stage {
            Stage::Seed => self.watered,
            Stage::Sprout => self.fertilizer_remaining.unwrap_or(0) > 0,
            Stage::Grown => false,
        }
    }

    /// Advances the clock by `elapsed_minutes` and moves up at most one stage.
    /// Minutes left over after a transition are dropped.
    pub fn grow<R: Rng + ?Sized>(&mut self, elapsed_minutes: i32, rng: &mut R) -> GardenResult<Growth> {
        if elapsed_minutes < 0 {
            return Err(GardenError::Validation(format!(
                "elapsed minutes must be non-negative, got {elapsed_minutes}"
            )));
        }
        if self.stage == Stage::Grown {
            return Ok(Growth::Mature);
        }

        let remaining = growth::tick(self.growth_time_remaining.unwrap_or(0), elapsed_minutes);
        self.growth_time_remaining = Some(remaining);
        if remaining > 0 {
            return Ok(Growth::Waiting);
        }
        if !self.gate_open() {
            return Ok(Growth::Stalled);
        }

        let (next, timer, charges) = match self.stage {
            Stage::Seed => (
                Stage::Sprout,
                Some(growth::stage1_duration(self.rarity, rng)),
                Some(0),
            ),
            Stage::Sprout | Stage::Grown => (Stage::Grown, None, None),
        };
        self.stage = next;
        self.growth_time_remaining = timer;
        self.fertilizer_remaining = charges;
        self.size = i32::from(i16::from(next)) + 1;
        Ok(Growth::Advanced(self.stage))
    }

    pub fn move_to(&mut self, position: Position) {
        self.x = position.x;
        self.y = position.y;
    }

    pub fn sell_value(&self) -> GardenResult<i64> {
        economy::sell_value(self.rarity, self.stage).ok_or(GardenError::InvalidStage {
            action: "sell",
            stage: self.stage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    fn seed_plant(rarity: Rarity) -> Plant {
        let mut plant = Plant::seed(
            "grower@example.com",
            PlantType::Berry,
            Position { x: 2, y: 3 },
            OffsetDateTime::UNIX_EPOCH,
            &mut rng(),
        );
        plant.rarity = rarity;
        plant
    }

    fn sprout(rarity: Rarity) -> Plant {
        let mut plant = seed_plant(rarity);
        plant.apply_water().unwrap();
        assert_eq!(plant.grow(30, &mut rng()).unwrap(), Growth::Advanced(Stage::Sprout));
        plant
    }

    #[test]
    fn new_seed_state() {
        let plant = seed_plant(Rarity::Common);
        assert_eq!(plant.stage, Stage::Seed);
        assert_eq!(plant.growth_time_remaining, Some(30));
        assert_eq!(plant.fertilizer_remaining, None);
        assert!(!plant.watered);
        assert_eq!((plant.x, plant.y), (2, 3));
    }

    #[test]
    fn unwatered_seed_stalls_at_zero() {
        let mut plant = seed_plant(Rarity::Common);
        let mut rng = rng();
        assert_eq!(plant.grow(10, &mut rng).unwrap(), Growth::Waiting);
        assert_eq!(plant.growth_time_remaining, Some(20));
        assert_eq!(plant.grow(100, &mut rng).unwrap(), Growth::Stalled);
        assert_eq!(plant.stage, Stage::Seed);
        assert_eq!(plant.growth_time_remaining, Some(0));

        plant.apply_water().unwrap();
        assert_eq!(plant.grow(0, &mut rng).unwrap(), Growth::Advanced(Stage::Sprout));
    }

    #[test]
    fn sprout_gets_rarity_timer() {
        for rarity in [Rarity::Common, Rarity::Rare, Rarity::Legendary] {
            let plant = sprout(rarity);
            let timer = plant.growth_time_remaining.unwrap();
            assert!(growth::stage1_range(rarity).contains(&timer));
            assert_eq!(plant.fertilizer_remaining, Some(0));
            assert_eq!(plant.size, 2);
        }
    }

    #[test]
    fn sprout_needs_fertilizer_to_finish() {
        let mut plant = sprout(Rarity::Rare);
        let mut rng = rng();
        assert_eq!(plant.grow(1_000, &mut rng).unwrap(), Growth::Stalled);
        assert_eq!(plant.stage, Stage::Sprout);

        plant.apply_fertilizer().unwrap();
        assert_eq!(plant.fertilizer_remaining, Some(FERTILIZER_CHARGES));
        assert_eq!(plant.grow(0, &mut rng).unwrap(), Growth::Advanced(Stage::Grown));
        assert_eq!(plant.growth_time_remaining, None);
        assert_eq!(plant.fertilizer_remaining, None);
    }

    #[test]
    fn early_fertilizer_carries_over() {
        let mut plant = sprout(Rarity::Common);
        plant.apply_fertilizer().unwrap();
        plant.apply_fertilizer().unwrap();
        assert_eq!(plant.fertilizer_remaining, Some(2));
        assert_eq!(plant.grow(500, &mut rng()).unwrap(), Growth::Advanced(Stage::Grown));
    }

    #[test]
    fn one_stage_per_tick() {
        let mut plant = seed_plant(Rarity::Common);
        plant.apply_water().unwrap();
        plant.grow(10_000, &mut rng()).unwrap();
        assert_eq!(plant.stage, Stage::Sprout);
        assert!(plant.growth_time_remaining.unwrap() >= 60);
    }

    #[test]
    fn stage_never_decreases() {
        let mut plant = seed_plant(Rarity::Legendary);
        let mut rng = rng();
        let mut last = plant.stage;
        for step in 0..40 {
            if step == 5 {
                plant.apply_water().unwrap();
            }
            if step == 20 {
                plant.apply_fertilizer().unwrap();
            }
            plant.grow(17, &mut rng).unwrap();
            assert!(plant.stage >= last);
            last = plant.stage;
        }
        assert_eq!(plant.stage, Stage::Grown);
        assert_eq!(plant.grow(60, &mut rng).unwrap(), Growth::Mature);
    }

    #[test]
    fn wrong_stage_actions() {
        let mut seed = seed_plant(Rarity::Common);
        assert!(matches!(
            seed.apply_fertilizer(),
            Err(GardenError::InvalidStage { action: "fertilize", stage: Stage::Seed })
        ));
        assert!(matches!(seed.sell_value(), Err(GardenError::InvalidStage { .. })));

        let mut sprout = sprout(Rarity::Common);
        assert!(matches!(
            sprout.apply_water(),
            Err(GardenError::InvalidStage { action: "water", stage: Stage::Sprout })
        ));
    }

    #[test]
    fn negative_elapsed_is_rejected() {
        let mut plant = seed_plant(Rarity::Common);
        assert!(matches!(plant.grow(-1, &mut rng()), Err(GardenError::Validation(_))));
        assert_eq!(plant.growth_time_remaining, Some(30));
    }

    #[test]
    fn sell_values_follow_stage() {
        assert_eq!(sprout(Rarity::Common).sell_value().unwrap(), 50);
        let mut grown = sprout(Rarity::Legendary);
        grown.apply_fertilizer().unwrap();
        grown.grow(360, &mut rng()).unwrap();
        assert_eq!(grown.sell_value().unwrap(), 500);
    }

    #[test]
    fn positions_must_be_non_negative() {
        assert!(Position::new(0, 0).is_ok());
        assert!(matches!(Position::new(-1, 4), Err(GardenError::Validation(_))));
        let mut plant = seed_plant(Rarity::Common);
        plant.move_to(Position::new(9, 1).unwrap());
        assert_eq!((plant.x, plant.y), (9, 1));
    }

    #[test]
    fn stage_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Stage::Sprout).unwrap(), "1");
        assert_eq!(serde_json::from_str::<Stage>("2").unwrap(), Stage::Grown);
        assert!(serde_json::from_str::<Stage>("3").is_err());
    }
}
