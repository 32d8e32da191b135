use serde::Deserialize;

use crate::garden::PlantType;

#[derive(Debug, Deserialize)]
pub struct BuyPlantRequest {
    pub plant_type: PlantType,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

#[derive(Debug, Deserialize)]
pub struct GrowRequest {
    pub elapsed_minutes: i32,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub x: i32,
    pub y: i32,
}
