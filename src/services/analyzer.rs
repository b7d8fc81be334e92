use std::sync::Arc;

use super::{image_prep, parser, VisionBackend};
use crate::error::AnalysisError;
use crate::models::AnalysisResult;

/// Candidate models in priority order: fast primary first, free fallback second.
pub const DEFAULT_MODELS: [&str; 2] = [
    "google/gemini-2.5-flash-preview-09-2025",
    "meta-llama/llama-4-scout:free",
];

/// Instruction prompt sent with every analysis request. Asks for a strict
/// JSON array so the parser has something to anchor on.
const ANALYSIS_PROMPT: &str = r#"You are a professional nutritionist analyzing food images. Analyze this food image carefully and provide accurate nutritional information for each distinct food item visible.

CRITICAL INSTRUCTIONS:
1. Only identify food items that are CLEARLY VISIBLE in the image
2. Do NOT make up or assume items that aren't shown
3. Provide REALISTIC and ACCURATE portion size estimates based on what you see
4. Use verified nutritional data from USDA or similar databases
5. If an item is partially visible or unclear, either skip it or clearly estimate conservatively
6. Consider typical serving sizes for the type of food shown

Return ONLY a valid JSON array with this exact structure (no additional text, markdown, or code blocks):
[
  {
    "name": "Specific food item name (e.g., 'Grilled Chicken Breast' not just 'Chicken')",
    "quantity": "Precise portion estimate with unit (e.g., '150g', '1 cup', '2 pieces', '1 medium apple')",
    "calories": number (kcal - be accurate, not rounded),
    "protein": number (grams - decimal precision),
    "carbs": number (grams - decimal precision),
    "fat": number (grams - decimal precision)
  }
]

ACCURACY GUIDELINES:
- Cross-reference nutritional values to ensure they make sense together
- Total calories should roughly equal: (protein x 4) + (carbs x 4) + (fat x 9)
- Be specific about preparation method if visible (fried, grilled, baked, etc.)
- Account for visible oils, sauces, or toppings in your calculations
- If portion size is uncertain, estimate conservatively and state it clearly
- Return empty array [] ONLY if absolutely no food is visible in the image"#;

/// Turns a meal photo into a validated nutrition breakdown.
///
/// Holds the backend handle and candidate model list, both read-only after
/// construction; `analyze` keeps no state between calls and may be invoked
/// concurrently from multiple tasks.
pub struct FoodAnalyzer {
    backend: Arc<dyn VisionBackend>,
    models: Vec<String>,
    max_edge: u32,
}

impl FoodAnalyzer {
    pub fn new(backend: Arc<dyn VisionBackend>, models: Vec<String>) -> Self {
        Self {
            backend,
            models,
            max_edge: image_prep::MAX_EDGE,
        }
    }

    /// Analyze an encoded meal photo: preprocess, then try each candidate
    /// model in order until one yields a non-empty item list.
    ///
    /// Per-candidate failures (transport errors, malformed replies, replies
    /// with zero usable items) are recorded and trigger the next candidate;
    /// only the last one surfaces if every candidate fails. At most one
    /// request is in flight at a time.
    pub async fn analyze(&self, image_bytes: &[u8]) -> Result<AnalysisResult, AnalysisError> {
        if !self.backend.is_configured() || self.models.is_empty() {
            return Err(AnalysisError::NotConfigured);
        }

        let jpeg = image_prep::prepare_image(image_bytes, self.max_edge)?;
        log::info!("📸 Image prepared: {} -> {} bytes", image_bytes.len(), jpeg.len());
        let data_url = image_prep::to_data_url(&jpeg);

        let mut last_failure = None;

        for model in &self.models {
            match self.try_model(model, &data_url).await {
                Ok(result) => {
                    log::info!("✅ {} recognized {} food item(s)", model, result.items.len());
                    return Ok(result);
                }
                Err(e) => {
                    log::warn!("⚠️ {} failed: {}", model, e);
                    last_failure = Some(e);
                }
            }
        }

        Err(last_failure.unwrap_or(AnalysisError::NoItemsDetected))
    }

    async fn try_model(
        &self,
        model: &str,
        image_data_url: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let reply = self
            .backend
            .complete(model, ANALYSIS_PROMPT, image_data_url)
            .await?;

        let items = parser::parse_ai_response(&reply)?;
        if items.is_empty() {
            return Err(AnalysisError::NoItemsDetected);
        }

        Ok(AnalysisResult { items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const BANANA_REPLY: &str =
        r#"[{"name":"Banana","quantity":"1 medium","calories":105,"protein":1.3,"carbs":27,"fat":0.4}]"#;

    struct MockBackend {
        configured: bool,
        calls: AtomicUsize,
        replies: Mutex<Vec<Result<String, AnalysisError>>>,
    }

    impl MockBackend {
        fn new(replies: Vec<Result<String, AnalysisError>>) -> Self {
            Self {
                configured: true,
                calls: AtomicUsize::new(0),
                replies: Mutex::new(replies),
            }
        }

        fn unconfigured() -> Self {
            let mut mock = Self::new(Vec::new());
            mock.configured = false;
            mock
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VisionBackend for MockBackend {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn complete(
            &self,
            _model: &str,
            _prompt: &str,
            _image_data_url: &str,
        ) -> Result<String, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies.lock().unwrap().remove(0)
        }
    }

    fn analyzer_with(mock: Arc<MockBackend>, model_count: usize) -> FoodAnalyzer {
        let models = (1..=model_count).map(|i| format!("test/model-{}", i)).collect();
        FoodAnalyzer::new(mock, models)
    }

    fn sample_photo() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            8,
            8,
            image::Rgb([180, 90, 30]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn transport_error() -> AnalysisError {
        AnalysisError::BackendRequest {
            model: "test/model-1".to_string(),
            message: "connection reset".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let mock = Arc::new(MockBackend::new(vec![
            Ok(BANANA_REPLY.to_string()),
            Ok(BANANA_REPLY.to_string()),
        ]));
        let analyzer = analyzer_with(mock.clone(), 2);

        let result = analyzer.analyze(&sample_photo()).await.unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_stops_at_first_usable_candidate() {
        let mock = Arc::new(MockBackend::new(vec![
            Err(transport_error()),
            Ok(BANANA_REPLY.to_string()),
            Ok(BANANA_REPLY.to_string()),
        ]));
        let analyzer = analyzer_with(mock.clone(), 3);

        let result = analyzer.analyze(&sample_photo()).await.unwrap();

        assert_eq!(result.items[0].name, "Banana");
        // second candidate succeeded, a third call must never happen
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_reply_falls_back() {
        let mock = Arc::new(MockBackend::new(vec![
            Ok("[{\"name\": \"Toast\", \"calories\": }]".to_string()),
            Ok(BANANA_REPLY.to_string()),
        ]));
        let analyzer = analyzer_with(mock.clone(), 2);

        let result = analyzer.analyze(&sample_photo()).await.unwrap();

        assert_eq!(result.items[0].name, "Banana");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_is_no_items_detected() {
        let mock = Arc::new(MockBackend::new(vec![
            Ok("I see no food here.".to_string()),
            Ok("Sorry, nothing recognizable.".to_string()),
        ]));
        let analyzer = analyzer_with(mock.clone(), 2);

        let result = analyzer.analyze(&sample_photo()).await;

        assert!(matches!(result, Err(AnalysisError::NoItemsDetected)));
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_last_failure_classification_surfaces() {
        let mock = Arc::new(MockBackend::new(vec![
            Ok("no food".to_string()),
            Err(AnalysisError::RateLimited("test/model-2: 429".to_string())),
        ]));
        let analyzer = analyzer_with(mock.clone(), 2);

        let result = analyzer.analyze(&sample_photo()).await;

        assert!(matches!(result, Err(AnalysisError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_unconfigured_backend_makes_no_calls() {
        let mock = Arc::new(MockBackend::unconfigured());
        let analyzer = analyzer_with(mock.clone(), 2);

        let result = analyzer.analyze(&sample_photo()).await;

        assert!(matches!(result, Err(AnalysisError::NotConfigured)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_image_short_circuits() {
        let mock = Arc::new(MockBackend::new(vec![Ok(BANANA_REPLY.to_string())]));
        let analyzer = analyzer_with(mock.clone(), 1);

        let result = analyzer.analyze(b"not an image at all").await;

        assert!(matches!(result, Err(AnalysisError::ImageDecode(_))));
        assert_eq!(mock.call_count(), 0);
    }
}
