use crate::common::StillImage;
use crate::error::ClassifyError;
use crate::inference::classification::Classification;
use async_trait::async_trait;
use futures::task::{Context, Poll};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower::util::BoxService;
use tower::{BoxError, Service};

/// Remote gesture classifier: one still image in, one label out.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: StillImage) -> Result<Classification, ClassifyError>;
}

/// Classifier stack the inference gate drives.
pub type ClassifierStack = BoxService<StillImage, Classification, ClassifyError>;

#[derive(Clone)]
pub struct ClassifierService {
    inner: Arc<dyn Classifier>,
}

impl ClassifierService {
    pub fn new(inner: Arc<dyn Classifier>) -> Self {
        Self { inner }
    }
}

impl Service<StillImage> for ClassifierService {
    type Response = Classification;
    type Error = ClassifyError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, image: StillImage) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move { inner.classify(image).await })
    }
}

pub struct ClassifierBuilder {
    classifier: Arc<dyn Classifier>,
    timeout: Option<Duration>,
}

impl ClassifierBuilder {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            timeout: None,
        }
    }

    /// No timeout by default; failures come from the transport itself.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> ClassifierStack {
        let service = ClassifierService::new(self.classifier);
        match self.timeout {
            Some(timeout) => BoxService::new(
                ServiceBuilder::new()
                    .map_err(|e: BoxError| ClassifyError::from_boxed(e))
                    .layer(TimeoutLayer::new(timeout))
                    .service(service),
            ),
            None => BoxService::new(service),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::classification::GestureLabel;
    use tower::ServiceExt;

    struct Fixed(&'static str);

    #[async_trait]
    impl Classifier for Fixed {
        async fn classify(&self, _image: StillImage) -> Result<Classification, ClassifyError> {
            Ok(Classification {
                label: GestureLabel::parse(self.0),
                confidence: 0.7,
            })
        }
    }

    struct Stalled;

    #[async_trait]
    impl Classifier for Stalled {
        async fn classify(&self, _image: StillImage) -> Result<Classification, ClassifyError> {
            futures::future::pending().await
        }
    }

    struct Broken;

    #[async_trait]
    impl Classifier for Broken {
        async fn classify(&self, _image: StillImage) -> Result<Classification, ClassifyError> {
            Err(ClassifyError::Status(502))
        }
    }

    fn still() -> StillImage {
        StillImage {
            bytes: vec![0xFF, 0xD8],
            width: 1,
            height: 1,
        }
    }

    #[tokio::test]
    async fn stack_passes_classification_through() {
        let stack = ClassifierBuilder::new(Arc::new(Fixed("Re"))).build();
        let response = stack.oneshot(still()).await.unwrap();
        assert_eq!(response.label, GestureLabel::parse("Re"));
    }

    #[tokio::test]
    async fn stack_preserves_classifier_error_kind() {
        let stack = ClassifierBuilder::new(Arc::new(Broken))
            .timeout(Some(Duration::from_secs(5)))
            .build();
        let error = stack.oneshot(still()).await.unwrap_err();
        assert!(matches!(error, ClassifyError::Status(502)));
    }

    #[tokio::test(start_paused = true)]
    async fn optional_timeout_fails_stalled_request() {
        let stack = ClassifierBuilder::new(Arc::new(Stalled))
            .timeout(Some(Duration::from_millis(250)))
            .build();
        let error = stack.oneshot(still()).await.unwrap_err();
        assert!(matches!(error, ClassifyError::Timeout));
    }
}
