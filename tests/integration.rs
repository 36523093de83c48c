use food_analyzer::{
    ai::{MockVisionModel, VisionModel},
    analysis::{
        classifier::CLASSIFY_SCHEMA_NAME,
        macros::{compute_macros, MacroTier},
        paths::{GEOMETRY_SCHEMA_NAME, LABEL_SCHEMA_NAME, MENU_SCHEMA_NAME},
        MacroCalculator, ResultNormalizer,
    },
    app::App,
    backend::{AnalyzerBackend, FallbackChain, PipelineBackend, StubBackend},
    models::{AnalyzeInput, BackendId, Config, EvidencePath, ImageType},
    priors::InMemoryPriorsStore,
    Error,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn macros() -> MacroCalculator {
    MacroCalculator::new(Arc::new(InMemoryPriorsStore::builtin().unwrap()))
}

fn pipeline(id: BackendId, model: MockVisionModel) -> Arc<dyn AnalyzerBackend> {
    let model: Arc<dyn VisionModel> = Arc::new(model);
    Arc::new(PipelineBackend::new(
        id,
        model,
        macros(),
        ResultNormalizer::new(&Config::default()),
    ))
}

fn stub() -> Arc<dyn AnalyzerBackend> {
    Arc::new(StubBackend::new(ResultNormalizer::new(&Config::default())))
}

fn app(backends: Vec<Arc<dyn AnalyzerBackend>>) -> App {
    App::with_chain(FallbackChain::new(backends), Duration::from_secs(30))
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.051
}

#[tokio::test]
async fn test_packaged_image_takes_label_path() {
    let model = MockVisionModel::new()
        .with_response(
            CLASSIFY_SCHEMA_NAME,
            json!({
                "imageType": "packaged",
                "confidence": 0.94,
                "reasoning": "Nutrition Facts panel on a cereal box",
                "restaurantName": null,
                "brandName": "Kellogg's"
            }),
        )
        .with_response(
            LABEL_SCHEMA_NAME,
            json!({
                "label": "Frosted Flakes",
                "confidence": 0.9,
                "calories": 130,
                "servingSize": "1 cup (37g)",
                "caloriesPerServing": 130,
                "totalServings": 14,
                "weightGrams": null,
                "proteinG": null,
                "carbsG": null,
                "fatG": null,
                "fiberG": null
            }),
        );

    let output = app(vec![pipeline(BackendId::Vision, model), stub()])
        .analyze(&AnalyzeInput::from_url("https://img.test/cereal-box.jpg"))
        .await
        .unwrap();

    let item = &output.items[0];
    assert_eq!(item.path, Some(EvidencePath::Label));
    assert_eq!(item.label, "frosted flakes");
    let label = item.nutrition_label.as_ref().unwrap();
    assert_eq!(label.serving_size, "1 cup (37g)");
    assert_eq!(label.calories_per_serving, 130.0);
    assert!(approx(item.sigma_calories, item.calories * 0.05));
    assert_eq!(item.weight_grams, 52.0);
    assert!(item.menu_item.is_none());
    assert!(item.priors.is_none());
    assert_eq!(output.meta.unwrap().used, vec![BackendId::Vision]);
}

#[tokio::test]
async fn test_named_restaurant_takes_menu_path() {
    let model = MockVisionModel::new()
        .with_response(
            CLASSIFY_SCHEMA_NAME,
            json!({
                "imageType": "restaurant",
                "confidence": 0.87,
                "reasoning": "Foil-wrapped burrito with Chipotle branding",
                "restaurantName": "Chipotle",
                "brandName": null
            }),
        )
        .with_response(
            MENU_SCHEMA_NAME,
            json!({
                "restaurant": "Chipotle",
                "itemName": "Chicken Burrito",
                "calories": 1050,
                "confidence": 0.8,
                "weightGrams": null,
                "proteinG": null,
                "carbsG": null,
                "fatG": null
            }),
        );

    let output = app(vec![pipeline(BackendId::Managed, model.clone()), stub()])
        .analyze(&AnalyzeInput::from_url("https://img.test/burrito.jpg"))
        .await
        .unwrap();

    let item = &output.items[0];
    assert_eq!(item.path, Some(EvidencePath::Menu));
    assert_eq!(item.menu_item.as_ref().unwrap().restaurant, "Chipotle");
    assert!(approx(item.sigma_calories, item.calories * 0.10));
    assert_eq!(item.image_type, Some(ImageType::Restaurant));
    assert!(item.evidence.contains(&"macros:ratio".to_string()));
    assert_eq!(model.get_calls(), vec![CLASSIFY_SCHEMA_NAME, MENU_SCHEMA_NAME]);
}

#[tokio::test]
async fn test_unnamed_restaurant_falls_through_to_geometry() {
    let model = MockVisionModel::new()
        .with_response(
            CLASSIFY_SCHEMA_NAME,
            json!({
                "imageType": "restaurant",
                "confidence": 0.6,
                "reasoning": "Restaurant plating, chain unknown",
                "restaurantName": null,
                "brandName": null
            }),
        )
        .with_response(
            GEOMETRY_SCHEMA_NAME,
            json!({
                "label": "pad thai",
                "confidence": 0.75,
                "volumeML": 450,
                "density": 0.9,
                "kcalPerG": 1.6,
                "weightGrams": 400,
                "totalCalories": 640,
                "proteinG": null,
                "carbsG": null,
                "fatG": null,
                "fiberG": null
            }),
        );

    let output = app(vec![pipeline(BackendId::Vision, model.clone())])
        .analyze(&AnalyzeInput::from_url("https://img.test/noodles.jpg"))
        .await
        .unwrap();

    let item = &output.items[0];
    assert_eq!(item.path, Some(EvidencePath::Geometry));
    assert!(item.menu_item.is_none());
    let priors = item.priors.unwrap();
    assert!(approx(priors.density.mu, 0.9));
    assert!((priors.density.sigma - 0.135).abs() < 1e-9);
    assert!((priors.kcal_per_g.sigma - 0.32).abs() < 1e-9);
    assert_eq!(item.volume_ml, 450.0);
    assert_eq!(model.get_calls(), vec![CLASSIFY_SCHEMA_NAME, GEOMETRY_SCHEMA_NAME]);
}

#[tokio::test]
async fn test_prepared_macros_override_low_raw_calories() {
    let model = MockVisionModel::new()
        .with_response(
            CLASSIFY_SCHEMA_NAME,
            json!({
                "imageType": "prepared",
                "confidence": 0.9,
                "reasoning": "Home-cooked plate",
                "restaurantName": null,
                "brandName": null
            }),
        )
        .with_response(
            GEOMETRY_SCHEMA_NAME,
            json!({
                "label": "pan-seared pork chop",
                "confidence": 0.8,
                "volumeML": null,
                "density": null,
                "kcalPerG": null,
                "weightGrams": 220,
                "totalCalories": 100,
                "proteinG": 30,
                "carbsG": 0,
                "fatG": 20,
                "fiberG": null
            }),
        );

    let output = app(vec![pipeline(BackendId::Vision, model), stub()])
        .analyze(&AnalyzeInput::from_url("https://img.test/pork.jpg"))
        .await
        .unwrap();

    let item = &output.items[0];
    assert_eq!(item.calories, 300.0);
    assert_eq!(item.sigma_calories, 45.0);
    assert_eq!(
        item.evidence,
        vec![
            "classifier:prepared",
            "backend:vision",
            "path:geometry",
            "macros:model",
            "calories:macros"
        ]
    );
}

#[tokio::test]
async fn test_menu_item_without_macros_keeps_published_calories() {
    let model = MockVisionModel::new()
        .with_response(
            CLASSIFY_SCHEMA_NAME,
            json!({
                "imageType": "restaurant",
                "confidence": 0.9,
                "reasoning": "Wrapped sandwich with chain logo",
                "restaurantName": "Chick-fil-A",
                "brandName": null
            }),
        )
        .with_response(
            MENU_SCHEMA_NAME,
            json!({
                "restaurant": "Chick-fil-A",
                "itemName": "Grilled Chicken Nuggets",
                "calories": 246,
                "confidence": 0.8,
                "weightGrams": 150,
                "proteinG": null,
                "carbsG": null,
                "fatG": null
            }),
        );

    let output = app(vec![pipeline(BackendId::Vision, model), stub()])
        .analyze(&AnalyzeInput::from_url("https://img.test/nuggets.jpg"))
        .await
        .unwrap();

    let item = &output.items[0];
    assert_eq!(item.calories, 246.0);
    assert_eq!(item.sigma_calories, 24.6);
    let macros = item.macros.unwrap();
    assert_eq!(macros.carbs_g, 0.0);
    assert_eq!(macros.fat_g, 5.5);
    assert_eq!(
        item.evidence,
        vec![
            "classifier:restaurant",
            "backend:vision",
            "path:menu",
            "macros:ratio",
            "calories:raw"
        ]
    );
}

#[tokio::test]
async fn test_both_remote_backends_failing_falls_back_to_stub() {
    let managed = MockVisionModel::failing("managed service unavailable");
    let vision = MockVisionModel::new()
        .with_response(
            CLASSIFY_SCHEMA_NAME,
            json!({
                "imageType": "prepared",
                "confidence": 0.9,
                "reasoning": "Plate of food",
                "restaurantName": null,
                "brandName": null
            }),
        )
        .with_raw_response(GEOMETRY_SCHEMA_NAME, "Sorry, I can't help with that.");

    let output = app(vec![
        pipeline(BackendId::Managed, managed.clone()),
        pipeline(BackendId::Vision, vision.clone()),
        stub(),
    ])
    .analyze(&AnalyzeInput::from_url("https://img.test/anything.jpg"))
    .await
    .unwrap();

    let meta = output.meta.unwrap();
    assert_eq!(meta.used, vec![BackendId::Managed, BackendId::Vision, BackendId::Stub]);
    assert_eq!(meta.is_fallback, Some(true));
    assert_eq!(output.items[0].analyzer_source, BackendId::Stub);
    assert_eq!(managed.get_call_count(), 1);
    assert_eq!(vision.get_call_count(), 2);
}

#[test]
fn test_unknown_label_uses_protein_ratio_tier() {
    let estimate = compute_macros(None, "chicken breast", 150.0, 231.0).unwrap();
    assert_eq!(estimate.tier, MacroTier::Ratio);
    assert_eq!(estimate.macros.protein_g, 17.3);
    assert_eq!(estimate.macros.carbs_g, 0.0);
    assert_eq!(estimate.macros.fat_g, 5.1);
}

#[tokio::test]
async fn test_chicken_breast_missing_from_builtin_priors() {
    let estimate = macros().calculate("chicken breast", 150.0, 231.0).await.unwrap();
    assert_eq!(estimate.tier, MacroTier::Ratio);
    assert_eq!(estimate.macros.protein_g, 17.3);

    let estimate = macros().calculate("Grilled Chicken", 150.0, 231.0).await.unwrap();
    assert_eq!(estimate.tier, MacroTier::Priors);
    assert_eq!(estimate.macros.protein_g, 46.5);
}

#[tokio::test]
async fn test_missing_image_never_reaches_a_backend() {
    let model = MockVisionModel::new();
    let err = app(vec![pipeline(BackendId::Vision, model.clone()), stub()])
        .analyze(&AnalyzeInput::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Input(_)));
    assert_eq!(model.get_call_count(), 0);
}

#[tokio::test]
async fn test_openai_compatible_endpoint_end_to_end() {
    let server = MockServer::start().await;

    let completion = |content: serde_json::Value| {
        json!({
            "choices": [{
                "message": { "role": "assistant", "content": content.to_string() },
                "finish_reason": "stop"
            }]
        })
    };

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("\"image_type\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
            "imageType": "prepared",
            "confidence": 0.8,
            "reasoning": "Bowl of rice",
            "restaurantName": null,
            "brandName": null
        }))))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("\"geometry_estimate\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
            "label": "white rice",
            "confidence": 0.85,
            "volumeML": null,
            "density": null,
            "kcalPerG": null,
            "weightGrams": 200,
            "totalCalories": 260,
            "proteinG": null,
            "carbsG": null,
            "fatG": null,
            "fiberG": null
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config {
        inference_api_key: Some("test-key".to_string()),
        inference_endpoint: server.uri(),
        ..Config::default()
    };
    let app = App::new(&config).unwrap();
    assert_eq!(app.backends(), vec![BackendId::Vision, BackendId::Stub]);

    let output = app
        .analyze(&AnalyzeInput::from_url("https://img.test/rice.jpg").with_region(Some("jp".into())))
        .await
        .unwrap();

    let item = &output.items[0];
    assert_eq!(item.analyzer_source, BackendId::Vision);
    assert_eq!(item.label, "white rice");
    assert_eq!(item.macros.unwrap().carbs_g, 56.4);
    assert!(item.evidence.contains(&"macros:priors".to_string()));
    // stored density replaces the model's missing guess
    assert_eq!(item.priors.unwrap().density.mu, 0.85);
    assert_eq!(output.meta.unwrap().is_fallback, Some(false));
}
