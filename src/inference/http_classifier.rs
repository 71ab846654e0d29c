use crate::common::StillImage;
use crate::config::InferenceSettings;
use crate::error::ClassifyError;
use crate::inference::classification::{Classification, GestureLabel};
use crate::inference::classifier::Classifier;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    prediction: Option<Vec<Prediction>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Posts the still frame as the single multipart field `file` and reads
/// `{"prediction": [{"label", "confidence"}]}` back.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: Client,
    url: String,
}

impl HttpClassifier {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn from_settings(settings: &InferenceSettings) -> Self {
        Self::new(Client::new(), settings.predict_url())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, image: StillImage) -> Result<Classification, ClassifyError> {
        let size = image.bytes.len();
        let part = Part::bytes(image.bytes)
            .file_name(StillImage::FILE_NAME)
            .mime_str(StillImage::MIME)?;
        let form = Form::new().part("file", part);

        let response = self.client.post(&self.url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        debug!(upload_bytes = size, response_bytes = body.len(), "Classifier responded");
        parse_prediction(&body)
    }
}

pub(crate) fn parse_prediction(body: &[u8]) -> Result<Classification, ClassifyError> {
    let parsed: PredictResponse =
        serde_json::from_slice(body).map_err(|e| ClassifyError::Malformed(e.to_string()))?;

    let first = match parsed.prediction.and_then(|p| p.into_iter().next()) {
        Some(first) => first,
        None => {
            return Err(ClassifyError::Malformed(
                parsed
                    .error
                    .unwrap_or_else(|| "missing prediction".to_string()),
            ));
        }
    };

    let label = first
        .label
        .filter(|label| !label.is_empty())
        .ok_or_else(|| ClassifyError::Malformed("prediction has no label".to_string()))?;

    let confidence = first.confidence.unwrap_or(0.0);
    if !confidence.is_finite() {
        return Err(ClassifyError::Malformed(format!(
            "confidence {confidence} is not a number"
        )));
    }

    Ok(Classification {
        label: GestureLabel::parse(&label),
        confidence: confidence.clamp(0.0, 1.0),
    })
}
