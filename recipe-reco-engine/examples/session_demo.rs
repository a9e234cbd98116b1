use async_trait::async_trait;
use recipe_reco_engine::{
    CacheKey, IngredientQuery, PaginationController, RawDetail, RawPage,
    RecipeDetailSource, RecipeId, Result, SearchQuery, SessionConfig,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Canned backend so the demo runs without a server.
struct FakeBackend;

impl FakeBackend {
    async fn combination_page(&self, page: u32) -> Result<RawPage> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let ids: &[&str] = match page {
            1 => &["101", "102", "103", "104", "105"],
            2 => &["103", "104", "106", "107", "108"],
            _ => &["109", "101", "110"],
        };
        Ok(RawPage {
            recipes: ids
                .iter()
                .map(|id| json!({"recipe_id": id, "recipe_title": format!("Recipe {}", id), "matched_count": 2}))
                .collect(),
            total: Some(ids.len() as u64),
            combination_number: Some(page),
            has_more_combinations: Some(page < 3),
            page: None,
        })
    }
}

#[async_trait]
impl RecipeDetailSource for FakeBackend {
    async fn fetch_detail(&self, id: &RecipeId) -> Result<RawDetail> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(RawDetail {
            materials: vec![json!({"name": "carrot", "amount": "1", "unit": "ea"})],
            recipe_title: json!(format!("Recipe {} (detailed)", id)),
            number_of_serving: json!("2 servings"),
            scrap_count: json!(12),
            ..Default::default()
        })
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let backend = Arc::new(FakeBackend);
    let controller = PaginationController::new(
        SessionConfig::per_page(),
        backend.clone(),
    );
    let query = SearchQuery::ingredients([
        IngredientQuery::new("carrot", 2.0, "ea"),
        IngredientQuery::new("potato", 1.0, "ea"),
        IngredientQuery::new("onion", 1.0, "ea"),
    ]);

    println!("=== Combination pages ===");
    for page in [1, 2, 3, 1] {
        let key = CacheKey::new(&query, page);
        let start = std::time::Instant::now();
        let entry = controller
            .resolve_page(&key, |page| backend.combination_page(page))
            .await?;
        let ids: Vec<_> = entry.recipes.iter().map(|r| r.id.as_str()).collect();
        println!("Page {} took {:?}: {:?}", page, start.elapsed(), ids);
    }

    println!("\n=== Enrichment ===");
    let first = controller
        .resolve_page(&CacheKey::new(&query, 1), |page| backend.combination_page(page))
        .await?;
    let mut updates = controller.enrichment_updates();
    if let Ok(handle) = controller.request_enrichment(&first.recipe_ids()) {
        println!("Batch report: {:?}", handle.await?);
        println!("Enrichment revision: {}", *updates.borrow_and_update());
    }

    for card in controller.cards(&first.recipes) {
        println!("{} | {} | {} | enriched: {}", card.id, card.title, card.servings, card.enriched);
    }

    println!("\nSession stats: {:?}", controller.stats());
    controller.reset_session();
    println!("After reset: {:?}", controller.stats());

    Ok(())
}
