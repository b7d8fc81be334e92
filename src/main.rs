mod error;
mod models;
mod services;

use anyhow::Result;
use dotenv::dotenv;
use std::env;
use std::sync::Arc;

use services::analyzer::DEFAULT_MODELS;
use services::{FoodAnalyzer, OpenRouterClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Load environment variables
    dotenv().ok();

    let image_path = env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("Usage: eaten-analyzer <image-path>"))?;

    // Missing key is handled by the analyzer (NotConfigured, no request sent)
    let api_key = env::var("OPENROUTER_API_KEY").unwrap_or_default();

    let models: Vec<String> = env::var("OPENROUTER_MODELS")
        .map(|v| {
            v.split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect()
        })
        .unwrap_or_else(|_| DEFAULT_MODELS.iter().map(|m| m.to_string()).collect());

    let backend = Arc::new(OpenRouterClient::new(api_key));
    let analyzer = FoodAnalyzer::new(backend, models.clone());
    log::info!("✅ Analyzer initialized with models: {:?}", models);

    let image_bytes = std::fs::read(&image_path)?;
    log::info!("📸 Analyzing {} ({} bytes)...", image_path, image_bytes.len());

    let result = analyzer.analyze(&image_bytes).await?;

    println!("\n🍽️ Found {} food item(s):\n", result.items.len());
    for item in &result.items {
        println!("  • {} ({})", item.name, item.quantity);
        println!(
            "    🔥 {:.0} kcal | 🥩 {:.1}g protein | 🍞 {:.1}g carbs | 🧈 {:.1}g fat",
            item.calories, item.protein, item.carbs, item.fat
        );
    }

    println!("\n📊 Total Nutrition");
    println!("   🔥 {:.0} kcal", result.total_calories());
    println!(
        "   🥩 {:.1}g protein | 🍞 {:.1}g carbs | 🧈 {:.1}g fat\n",
        result.total_protein(),
        result.total_carbs(),
        result.total_fat()
    );

    Ok(())
}
