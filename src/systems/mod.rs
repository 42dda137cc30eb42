//! ECS systems for the arena simulation.
//!
//! Systems contain the game logic that operates on components.
//!
//! ## Tick order
//!
//! Every tick runs the systems below as one chain; commands issued by a system
//! are applied before the next one runs.
//!
//! 1. `wave_spawn_system` - starts waves and spawns enemies
//! 2. `spatial_hash_update_system` - rebuilds the broad-phase grid
//! 3. `ai_system` - target selection and movement intent
//! 4. `combat_system` - attack state machines, melee hits, projectile launch
//! 5. `projectile_system` - homing, integration, hits, coin flight
//! 6. `death_system` - turns lethal hits into corpses
//! 7. `currency_drop_system` - spawns coins from the pool
//! 8. `collision_system` - pushes overlapping combatants apart
//! 9. `movement_system` - integrates intent and impulse velocity
//! 10. `pickup_system` - coin magnet and collection
//! 11. `lifetime_system` - expiry and recycling

pub mod ai;
pub mod collision;
pub mod combat;
pub mod death;
pub mod lifetime;
pub mod movement;
pub mod pickup;
pub mod projectile;
pub mod waves;

pub use ai::*;
pub use collision::*;
pub use combat::{combat_system, spawn_damage_number};
pub use death::*;
pub use lifetime::*;
pub use movement::*;
pub use pickup::*;
pub use projectile::*;
pub use waves::*;
