mod crafting;
mod inventory;
mod npc;

pub use crafting::{CraftError, CraftProgress, CraftTick, Crafter};
pub use inventory::{Inventory, ItemCounts};
pub use npc::{ActionError, Npc, NpcDescriptor};
