//! Embedding executor with bounded concurrency and dimension checks.

use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::{embed::EmbeddingsProvider, errors::RagError, record::RagRecord};

/// Embeds every record that has no vector yet.
///
/// At most `concurrency` requests are in flight. The first failure stops the
/// batch: no further requests start, in-flight ones are dropped, and records
/// are left untouched.
///
/// # Errors
/// [`RagError::VectorSizeMismatch`] when a vector differs from `expected_dim`
/// (or from the first vector when `expected_dim` is `None`), or any provider error.
pub async fn embed_missing(
    records: &mut [RagRecord],
    provider: &dyn EmbeddingsProvider,
    expected_dim: Option<usize>,
    concurrency: usize,
    progress: Option<&ProgressBar>,
) -> Result<usize, RagError> {
    let idxs: Vec<usize> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.embedding.is_none().then_some(i))
        .collect();

    if idxs.is_empty() {
        debug!("nothing to embed");
        return Ok(0);
    }
    info!(pending = idxs.len(), concurrency, "embedding chunks");

    let results: Vec<(usize, Vec<f32>)> = stream::iter(idxs)
        .map(|i| {
            let text = records[i].text.clone();
            Ok::<_, RagError>(async move {
                let v = provider.embed(&text).await?;
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                Ok::<(usize, Vec<f32>), RagError>((i, v))
            })
        })
        .try_buffer_unordered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut want = expected_dim;
    for (_, v) in &results {
        match want {
            Some(w) if v.len() != w => {
                return Err(RagError::VectorSizeMismatch { got: v.len(), want: w });
            }
            None => want = Some(v.len()),
            _ => {}
        }
    }

    let n = results.len();
    for (i, v) in results {
        records[i].embedding = Some(v);
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails every call, like a provider that is down.
    struct DeadEmbedder {
        calls: AtomicUsize,
    }

    impl EmbeddingsProvider for DeadEmbedder {
        fn embed<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RagError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(RagError::Config("provider down".into()))
            })
        }
    }

    struct LenEmbedder {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl EmbeddingsProvider for LenEmbedder {
        fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RagError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(vec![text.len() as f32, 1.0])
            })
        }
    }

    fn rec(i: usize, text: &str) -> RagRecord {
        RagRecord {
            id: i.to_string(),
            text: text.into(),
            source: "doc.pdf".into(),
            chunk_index: i,
            embedding: None,
        }
    }

    #[tokio::test]
    async fn fills_vectors_with_bounded_fan_out() {
        let p = LenEmbedder {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let mut recs: Vec<RagRecord> = (0..12).map(|i| rec(i, &"x".repeat(i + 1))).collect();
        let n = embed_missing(&mut recs, &p, Some(2), 5, None).await.unwrap();
        assert_eq!(n, 12);
        assert_eq!(p.calls.load(Ordering::SeqCst), 12);
        assert!(p.peak.load(Ordering::SeqCst) <= 5);
        assert_eq!(recs[3].embedding.as_deref(), Some(&[4.0, 1.0][..]));
    }

    #[tokio::test]
    async fn wrong_dimension_fails() {
        let p = LenEmbedder {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let mut recs = vec![rec(0, "a")];
        let err = embed_missing(&mut recs, &p, Some(768), 5, None).await.unwrap_err();
        assert!(matches!(err, RagError::VectorSizeMismatch { got: 2, want: 768 }));
        assert!(recs[0].embedding.is_none());
    }

    #[tokio::test]
    async fn first_failure_stops_further_requests() {
        let p = DeadEmbedder {
            calls: AtomicUsize::new(0),
        };
        let mut recs: Vec<RagRecord> = (0..200).map(|i| rec(i, "chunk")).collect();
        let err = embed_missing(&mut recs, &p, None, 5, None).await.unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
        assert!(p.calls.load(Ordering::SeqCst) <= 5);
        assert!(recs.iter().all(|r| r.embedding.is_none()));
    }
}
