//! Getter Module
//!
//! The application-supplied loader a group falls back to on a miss.

use std::future::Future;

use async_trait::async_trait;

use crate::error::Result;

// == Getter ==
/// Loads a key's value from the authoritative source.
///
/// Called at most once at a time per key on a node. Return
/// [`CacheError::LoadFailed`] when the key does not exist.
///
/// [`CacheError::LoadFailed`]: crate::error::CacheError::LoadFailed
#[async_trait]
pub trait Getter: Send + Sync {
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
}

// == Getter Func ==
/// Adapts an async closure into a [`Getter`].
///
/// # Example
/// ```ignore
/// let getter = GetterFunc(|key: String| async move { Ok::<_, CacheError>(key.into_bytes()) });
/// ```
pub struct GetterFunc<F>(pub F);

#[async_trait]
impl<F, Fut> Getter for GetterFunc<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<u8>>> + Send + 'static,
{
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        (self.0)(key.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;

    #[tokio::test]
    async fn test_getter_func() {
        let getter = GetterFunc(|key: String| async move { Ok::<_, CacheError>(key.into_bytes()) });
        assert_eq!(getter.get("key").await.unwrap(), b"key".to_vec());
    }
}
