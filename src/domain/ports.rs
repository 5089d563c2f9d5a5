use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Semantic similarity between two normalized skills.
///
/// Implementations must return a value in `[0, 1]` and must be deterministic
/// for identical inputs, otherwise match reports are not reproducible.
#[async_trait]
pub trait SimilarityProvider: Send + Sync {
    async fn similarity(&self, a: &str, b: &str) -> Result<f32>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: SimilarityProvider + ?Sized> SimilarityProvider for Box<T> {
    async fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        (**self).similarity(a, b).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
