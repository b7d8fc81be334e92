use serde::{Deserialize, Serialize};

/// One recognized food item with its estimated portion and macros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionItem {
    pub name: String,
    pub quantity: String,  // portion text ("150g", "1 cup", "2 pieces")
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// Recognized items in the order the model listed them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub items: Vec<NutritionItem>,
}

impl AnalysisResult {
    pub fn total_calories(&self) -> f64 {
        self.items.iter().map(|i| i.calories).sum()
    }

    pub fn total_protein(&self) -> f64 {
        self.items.iter().map(|i| i.protein).sum()
    }

    pub fn total_carbs(&self) -> f64 {
        self.items.iter().map(|i| i.carbs).sum()
    }

    pub fn total_fat(&self) -> f64 {
        self.items.iter().map(|i| i.fat).sum()
    }
}
