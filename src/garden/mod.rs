//! Plant lifecycle and economy rules.
//!
//! `rarity`, `growth` and `economy` are pure tables and draws. `plant` and
//! `account` hold the per-entity state machines. `engine` is the only place
//! where both are mutated together, always inside one store unit of work.

pub mod account;
pub mod economy;
pub mod engine;
pub mod growth;
pub mod plant;
pub mod rarity;

pub use account::{NewAccount, User};
pub use engine::{GardenEngine, PlantReceipt, SaleReceipt};
pub use plant::{Plant, Stage};
pub use rarity::PlantType;
