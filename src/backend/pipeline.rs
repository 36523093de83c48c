use super::{AnalysisRequest, AnalyzerBackend};
use crate::ai::VisionModel;
use crate::analysis::{ImageTypeClassifier, MacroCalculator, PathRunner, ResultNormalizer};
use crate::models::{AnalyzeOutput, BackendId};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Classify, run the evidence path, normalize; all against one model.
pub struct PipelineBackend {
    id: BackendId,
    model: Arc<dyn VisionModel>,
    classifier: ImageTypeClassifier,
    macros: MacroCalculator,
    normalizer: ResultNormalizer,
}

impl PipelineBackend {
    pub fn new(
        id: BackendId,
        model: Arc<dyn VisionModel>,
        macros: MacroCalculator,
        normalizer: ResultNormalizer,
    ) -> Self {
        Self {
            id,
            classifier: ImageTypeClassifier::new(model.clone()),
            model,
            macros,
            normalizer,
        }
    }
}

#[async_trait]
impl AnalyzerBackend for PipelineBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalyzeOutput> {
        let region = request.region.as_deref();
        let image = self.model.prepare_image(&request.image).await?;
        let classification = self.classifier.classify(&image, region).await?;

        let mut candidate = PathRunner::new(self.model.as_ref(), &self.macros)
            .run(&image, &classification, region)
            .await?;

        candidate.image_type = Some(classification.image_type);
        candidate.classifier_confidence = Some(classification.confidence);
        let mut evidence = vec![
            format!("classifier:{}", classification.image_type),
            format!("backend:{}", self.id),
        ];
        evidence.append(&mut candidate.evidence);
        candidate.evidence = evidence;

        self.normalizer.normalize(self.id, vec![candidate])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockVisionModel;
    use crate::analysis::classifier::CLASSIFY_SCHEMA_NAME;
    use crate::analysis::paths::LABEL_SCHEMA_NAME;
    use crate::models::{AnalyzeInput, Config, EvidencePath, ImageType};
    use crate::priors::InMemoryPriorsStore;
    use crate::Error;
    use serde_json::json;

    fn backend(model: MockVisionModel) -> PipelineBackend {
        PipelineBackend::new(
            BackendId::Vision,
            Arc::new(model),
            MacroCalculator::new(Arc::new(InMemoryPriorsStore::empty())),
            ResultNormalizer::new(&Config::default()),
        )
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest::from_input(&AnalyzeInput::from_url("https://img.test/cereal.jpg")).unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_tags_evidence_in_order() {
        let model = MockVisionModel::new()
            .with_response(
                CLASSIFY_SCHEMA_NAME,
                json!({
                    "imageType": "packaged",
                    "confidence": 0.9,
                    "reasoning": "Panel visible",
                    "restaurantName": null,
                    "brandName": "Cheerios"
                }),
            )
            .with_response(
                LABEL_SCHEMA_NAME,
                json!({
                    "label": "Cheerios",
                    "confidence": 0.85,
                    "calories": 140,
                    "servingSize": "1 1/2 cup (39g)",
                    "caloriesPerServing": 140,
                    "totalServings": 12,
                    "weightGrams": 39,
                    "proteinG": 5,
                    "carbsG": 29,
                    "fatG": 2.5,
                    "fiberG": 4
                }),
            );

        let output = backend(model.clone()).analyze(&request()).await.unwrap();
        let item = &output.items[0];

        assert_eq!(item.path, Some(EvidencePath::Label));
        assert_eq!(item.image_type, Some(ImageType::Packaged));
        assert_eq!(item.classifier_confidence, Some(0.9));
        assert_eq!(item.analyzer_source, BackendId::Vision);
        assert_eq!(item.calories, 159.0);
        assert_eq!(
            item.evidence,
            vec![
                "classifier:packaged",
                "backend:vision",
                "path:label",
                "macros:label",
                "calories:macros"
            ]
        );
        assert_eq!(model.get_calls(), vec![CLASSIFY_SCHEMA_NAME, LABEL_SCHEMA_NAME]);
    }

    #[tokio::test]
    async fn test_pipeline_stops_at_classification_failure() {
        let model = MockVisionModel::new().with_error(CLASSIFY_SCHEMA_NAME, "quota exceeded");
        let err = backend(model.clone()).analyze(&request()).await.unwrap_err();
        assert!(matches!(err, Error::Classification(_)));
        assert_eq!(model.get_call_count(), 1);
    }
}
