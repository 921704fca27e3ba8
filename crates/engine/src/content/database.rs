use std::collections::HashMap;

use crate::agent::ItemCounts;
use crate::world::AreaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecipeId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub inputs: ItemCounts,
    pub outputs: ItemCounts,
    pub time_per_unit: f32,
    pub station: Option<AreaKind>,
}

impl Recipe {
    pub fn inputs_for(&self, qty: u32) -> ItemCounts {
        self.inputs
            .iter()
            .map(|(item, per_unit)| (item.clone(), per_unit.saturating_mul(qty)))
            .collect()
    }
}

/// Immutable recipe table, keyed by name. Ids follow name order.
#[derive(Debug, Default, Clone)]
pub struct RecipeRegistry {
    recipes: Vec<Recipe>,
    recipe_ids_by_name: HashMap<String, RecipeId>,
}

impl RecipeRegistry {
    pub fn from_recipes(mut recipes: Vec<Recipe>) -> Self {
        recipes.sort_by(|a, b| a.name.cmp(&b.name));
        recipes.dedup_by(|later, earlier| later.name == earlier.name);
        let mut recipe_ids_by_name = HashMap::with_capacity(recipes.len());
        for (idx, recipe) in recipes.iter_mut().enumerate() {
            let id = RecipeId(idx as u32);
            recipe.id = id;
            recipe_ids_by_name.insert(recipe.name.clone(), id);
        }
        Self {
            recipes,
            recipe_ids_by_name,
        }
    }

    pub fn recipe_id_by_name(&self, name: &str) -> Option<RecipeId> {
        self.recipe_ids_by_name.get(name).copied()
    }

    pub fn recipe(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipes.get(id.0 as usize)
    }

    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipe_id_by_name(name).and_then(|id| self.recipe(id))
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
