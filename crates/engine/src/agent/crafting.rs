use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::content::{Recipe, RecipeRegistry};
use crate::world::AreaKind;

use super::inventory::Inventory;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CraftError {
    #[error("already crafting '{active_recipe}'")]
    AlreadyBusy { active_recipe: String },
    #[error("quantity must be greater than zero")]
    InvalidQuantity,
    #[error("recipe '{name}' not found")]
    UnknownRecipe { name: String },
    #[error("recipe '{name}' is not known by this agent")]
    RecipeNotKnown { name: String },
    #[error("recipe '{recipe}' must be crafted inside a '{}' area", .required.as_token())]
    WrongStation { recipe: String, required: AreaKind },
    #[error("not enough inputs to craft {qty} x '{recipe}'")]
    MissingInputs { recipe: String, qty: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CraftTask {
    recipe: Recipe,
    qty_total: u32,
    qty_remaining: u32,
    time_left_unit: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CraftProgress {
    pub recipe: String,
    pub units_done: u32,
    pub units_total: u32,
    pub unit_time_left: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CraftTick {
    Idle,
    Progressed { units_completed: u32 },
    Completed { units_completed: u32 },
    LeftStation,
}

/// Per-agent crafting state machine: Idle, or one active task.
///
/// Inputs for the whole batch are taken up front; cancelling or walking away
/// from the station never refunds them.
#[derive(Debug, Clone)]
pub struct Crafter {
    registry: Arc<RecipeRegistry>,
    known_recipes: BTreeSet<String>,
    task: Option<CraftTask>,
}

impl Crafter {
    pub fn new(registry: Arc<RecipeRegistry>, known_recipes: impl IntoIterator<Item = String>) -> Self {
        Self {
            registry,
            known_recipes: known_recipes.into_iter().collect(),
            task: None,
        }
    }

    pub fn learn(&mut self, recipe_name: &str) -> bool {
        self.known_recipes.insert(recipe_name.to_string())
    }

    pub fn knows(&self, recipe_name: &str) -> bool {
        self.known_recipes.contains(recipe_name)
    }

    pub fn known_recipes(&self) -> impl Iterator<Item = &str> {
        self.known_recipes.iter().map(String::as_str)
    }

    /// Starts a batch. `kinds_here` are the area kinds containing the agent's
    /// cell.
    pub fn start(
        &mut self,
        recipe_name: &str,
        qty: u32,
        kinds_here: &[AreaKind],
        inventory: &mut Inventory,
    ) -> Result<&Recipe, CraftError> {
        if let Some(task) = &self.task {
            return Err(CraftError::AlreadyBusy {
                active_recipe: task.recipe.name.clone(),
            });
        }
        if qty == 0 {
            return Err(CraftError::InvalidQuantity);
        }
        let Some(recipe) = self.registry.get(recipe_name) else {
            return Err(CraftError::UnknownRecipe {
                name: recipe_name.to_string(),
            });
        };
        if !self.known_recipes.contains(recipe_name) {
            return Err(CraftError::RecipeNotKnown {
                name: recipe_name.to_string(),
            });
        }
        if let Some(required) = recipe.station {
            if !kinds_here.contains(&required) {
                return Err(CraftError::WrongStation {
                    recipe: recipe.name.clone(),
                    required,
                });
            }
        }
        if !inventory.remove(&recipe.inputs_for(qty)) {
            return Err(CraftError::MissingInputs {
                recipe: recipe.name.clone(),
                qty,
            });
        }

        let task = self.task.insert(CraftTask {
            recipe: recipe.clone(),
            qty_total: qty,
            qty_remaining: qty,
            time_left_unit: recipe.time_per_unit,
        });
        Ok(&task.recipe)
    }

    pub fn update(
        &mut self,
        dt_seconds: f32,
        kinds_here: &[AreaKind],
        inventory: &mut Inventory,
    ) -> CraftTick {
        let Some(task) = self.task.as_mut() else {
            return CraftTick::Idle;
        };
        if let Some(required) = task.recipe.station {
            if !kinds_here.contains(&required) {
                self.task = None;
                return CraftTick::LeftStation;
            }
        }
        if !dt_seconds.is_finite() || dt_seconds <= 0.0 {
            return CraftTick::Progressed { units_completed: 0 };
        }

        let mut remaining = dt_seconds;
        let mut units_completed = 0u32;
        while remaining > 0.0 && task.qty_remaining > 0 {
            if remaining >= task.time_left_unit {
                remaining -= task.time_left_unit;
                inventory.add(&task.recipe.outputs);
                task.qty_remaining -= 1;
                task.time_left_unit = task.recipe.time_per_unit;
                units_completed += 1;
            } else {
                task.time_left_unit -= remaining;
                remaining = 0.0;
            }
        }

        if task.qty_remaining == 0 {
            self.task = None;
            return CraftTick::Completed { units_completed };
        }
        CraftTick::Progressed { units_completed }
    }

    pub fn cancel(&mut self) -> bool {
        self.task.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    pub fn progress(&self) -> Option<CraftProgress> {
        self.task.as_ref().map(|task| CraftProgress {
            recipe: task.recipe.name.clone(),
            units_done: task.qty_total - task.qty_remaining,
            units_total: task.qty_total,
            unit_time_left: task.time_left_unit,
        })
    }
}
