// xats-core/src/registry/fetch.rs
use tracing::{debug, instrument};
use xats_common::error::Result;
use xats_common::model::ResolvedReference;
use xats_net::{verify_fetched, Fetcher};

/// Fetches the bytes behind a resolution and checks them against the
/// declared size and integrity before handing them out.
#[instrument(skip(fetcher), fields(url = %resolved.resolved_url))]
pub async fn fetch_verified(resolved: &ResolvedReference, fetcher: &dyn Fetcher) -> Result<Vec<u8>> {
    let bytes = fetcher.fetch(&resolved.resolved_url).await?;
    debug!("Fetched {} bytes, verifying", bytes.len());
    verify_fetched(resolved, &bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use xats_common::error::{ErrorCode, XatsError};

    use super::super::tests::biology_commons;
    use super::super::RegistryResolver;
    use super::*;

    struct StaticFetcher(HashMap<String, Vec<u8>>);

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| XatsError::Network(url.to_string(), "HTTP 404 Not Found".into()))
        }
    }

    #[tokio::test]
    async fn rejects_bytes_that_do_not_match() {
        let resolver = RegistryResolver::new(biology_commons());
        let resolved = resolver
            .resolve_one("xats://biology-commons/cell-diagrams@1.0.0/figures/mitosis.svg")
            .unwrap();
        let fetcher = StaticFetcher(HashMap::from([(
            resolved.resolved_url.clone(),
            vec![b'x'; 512],
        )]));
        let err = fetch_verified(&resolved, &fetcher).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::IntegrityMismatch);

        let short = StaticFetcher(HashMap::from([(resolved.resolved_url.clone(), vec![])]));
        let err = fetch_verified(&resolved, &short).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::IntegrityMismatch);
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        let resolver = RegistryResolver::new(biology_commons());
        let resolved = resolver.resolve_one("xats://biology-commons/cell-diagrams").unwrap();
        let err = fetch_verified(&resolved, &StaticFetcher(HashMap::new()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NetworkError);
    }
}
