//! End-to-end answer flow: rewrite → retrieve → assemble → generate.

use std::sync::Arc;

use ai_llm_service::{ChatTurn, LlmProfile};
use rag_store::{EmbeddingsProvider, RagStore};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::assembler::assemble_context;
use crate::cfg::ContextorConfig;
use crate::conversation::Conversation;
use crate::error::ContextorError;
use crate::llm::ChatGenerator;
use crate::prompt::{REFUSAL, answer_system};
use crate::retriever::Retriever;
use crate::rewriter::QueryRewriter;

/// Result of one pipeline run.
#[derive(Clone, Debug, Serialize)]
pub struct QaAnswer {
    /// Generated text, returned verbatim.
    pub answer: String,
    /// `None` when the run short-circuited before rewriting.
    pub standalone_query: Option<String>,
    /// Context block handed to the generator.
    pub context: String,
}

impl QaAnswer {
    fn refusal() -> Self {
        Self {
            answer: REFUSAL.to_string(),
            standalone_query: None,
            context: String::new(),
        }
    }
}

/// Per-request RAG orchestration. Cheap to clone; holds no request state.
#[derive(Clone)]
pub struct RagPipeline {
    cfg: ContextorConfig,
    rewriter: QueryRewriter,
    retriever: Retriever,
    chat: Arc<dyn ChatGenerator>,
}

impl RagPipeline {
    pub fn new(
        cfg: ContextorConfig,
        chat: Arc<dyn ChatGenerator>,
        store: RagStore,
        embedder: Arc<dyn EmbeddingsProvider>,
    ) -> Self {
        Self {
            rewriter: QueryRewriter::new(chat.clone()),
            retriever: Retriever::new(store, embedder, cfg.top_k),
            chat,
            cfg,
        }
    }

    /// Answers the latest user turn of `conv` from the indexed document.
    ///
    /// Without a user turn the refusal sentence comes back and no external
    /// service is called. Dropping the returned future cancels in-flight calls.
    ///
    /// # Errors
    /// Upstream failures, an empty rewrite, or [`ContextorError::Timeout`] when
    /// the run exceeds `request_timeout`.
    pub async fn answer(&self, conv: &Conversation) -> Result<QaAnswer, ContextorError> {
        let limit = self.cfg.request_timeout;
        match tokio::time::timeout(limit, self.run(conv)).await {
            Ok(res) => res,
            Err(_) => {
                warn!(timeout_secs = limit.as_secs(), "pipeline timed out");
                Err(ContextorError::Timeout(limit))
            }
        }
    }

    #[instrument(skip_all, fields(turns = conv.turns().len()))]
    async fn run(&self, conv: &Conversation) -> Result<QaAnswer, ContextorError> {
        let Some((_, latest)) = conv.latest_user() else {
            info!("no user turn; returning refusal");
            return Ok(QaAnswer::refusal());
        };

        let history = conv.chat_history();
        let standalone = self.rewriter.rewrite(&history, latest).await?;

        let hits = self.retriever.retrieve(&standalone).await?;
        let context = assemble_context(&hits, self.cfg.max_ctx_chars);

        let mut turns = history;
        turns.push(ChatTurn::user(standalone.clone()));
        let system = answer_system(&self.cfg.persona, &context);

        let answer = self.chat.generate(LlmProfile::Slow, &turns, &system).await?;
        info!(
            hits = hits.len(),
            context_chars = context.chars().count(),
            answer_chars = answer.chars().count(),
            "answer generated"
        );

        Ok(QaAnswer {
            answer,
            standalone_query: Some(standalone),
            context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_llm_service::ChatRole;
    use futures::future::BoxFuture;
    use rag_store::{
        DistanceKind, IndexPoint, MemoryIndex, RagConfig, RagError, VectorBackend, VectorIndex,
        VectorSpace,
    };
    use serde_json::{Map, Value, json};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::time::Duration;

    const STANDALONE: &str = "What is the time complexity of quicksort?";

    /// Rewrites to a fixed question and answers by echoing whether context was empty.
    #[derive(Default)]
    struct StubChat {
        calls: Mutex<Vec<(LlmProfile, Vec<ChatTurn>, String)>>,
        rewrite: Option<String>,
        /// Rewrite returns the latest turn unchanged.
        echo: bool,
        stall: bool,
    }

    impl ChatGenerator for StubChat {
        fn generate<'a>(
            &'a self,
            profile: LlmProfile,
            turns: &'a [ChatTurn],
            system: &'a str,
        ) -> BoxFuture<'a, Result<String, ContextorError>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push((profile, turns.to_vec(), system.to_string()));
                if self.stall {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                match profile {
                    LlmProfile::Fast if self.echo => {
                        Ok(turns.last().map(|t| t.content.clone()).unwrap_or_default())
                    }
                    LlmProfile::Fast => Ok(self.rewrite.clone().unwrap_or_else(|| STANDALONE.into())),
                    LlmProfile::Slow if system.contains("Context:\n\n\n") => Ok(REFUSAL.into()),
                    LlmProfile::Slow => Ok("O(n log n) on average.".into()),
                }
            })
        }
    }

    struct AxisEmbedder {
        calls: AtomicUsize,
    }

    impl EmbeddingsProvider for AxisEmbedder {
        fn embed<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RagError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1.0, 0.0])
            })
        }
    }

    /// Points heap questions at one axis and everything else at the other.
    struct TopicEmbedder;

    impl EmbeddingsProvider for TopicEmbedder {
        fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RagError>> {
            Box::pin(async move {
                tokio::task::yield_now().await;
                Ok(if text.contains("heap") {
                    vec![1.0, 0.0]
                } else {
                    vec![0.0, 1.0]
                })
            })
        }
    }

    /// Records the requested top-K and delegates to a memory index.
    struct SpyIndex {
        inner: MemoryIndex,
        last_top_k: AtomicU64,
    }

    impl VectorIndex for SpyIndex {
        fn ensure_collection<'a>(&'a self, space: &'a VectorSpace) -> BoxFuture<'a, Result<(), RagError>> {
            self.inner.ensure_collection(space)
        }
        fn reset(&self) -> BoxFuture<'_, Result<(), RagError>> {
            self.inner.reset()
        }
        fn upsert(&self, points: Vec<IndexPoint>) -> BoxFuture<'_, Result<u64, RagError>> {
            self.inner.upsert(points)
        }
        fn query(
            &self,
            vector: Vec<f32>,
            top_k: u64,
            with_payload: bool,
        ) -> BoxFuture<'_, Result<Vec<(f32, Value)>, RagError>> {
            self.last_top_k.store(top_k, Ordering::SeqCst);
            self.inner.query(vector, top_k, with_payload)
        }
    }

    struct Fixture {
        pipeline: RagPipeline,
        chat: Arc<StubChat>,
        embedder: Arc<AxisEmbedder>,
        index: Arc<SpyIndex>,
    }

    async fn fixture(chunks: &[&str], chat: StubChat) -> Fixture {
        let index = Arc::new(SpyIndex {
            inner: MemoryIndex::new(),
            last_top_k: AtomicU64::new(0),
        });
        index
            .ensure_collection(&VectorSpace {
                size: 2,
                distance: DistanceKind::Cosine,
            })
            .await
            .unwrap();
        let points = chunks
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let mut payload = Map::new();
                payload.insert("text".into(), json!(t));
                payload.insert("source".into(), json!("doc.pdf"));
                payload.insert("chunk_index".into(), json!(i));
                IndexPoint {
                    id: format!("c{i}"),
                    vector: vec![1.0, i as f32],
                    payload,
                }
            })
            .collect();
        index.upsert(points).await.unwrap();

        let mut rag_cfg = RagConfig::new_default("http://localhost:6334", "docqa-test");
        rag_cfg.backend = VectorBackend::Memory;
        let store = RagStore::with_index(rag_cfg, index.clone());

        let chat = Arc::new(chat);
        let embedder = Arc::new(AxisEmbedder {
            calls: AtomicUsize::new(0),
        });
        let pipeline = RagPipeline::new(
            ContextorConfig::default(),
            chat.clone(),
            store,
            embedder.clone(),
        );
        Fixture {
            pipeline,
            chat,
            embedder,
            index,
        }
    }

    #[tokio::test]
    async fn no_user_turn_short_circuits_without_calls() {
        let f = fixture(&["Quicksort partitions."], StubChat::default()).await;
        let cases = [
            Conversation::from_request(&json!([]), None),
            Conversation::from_request(&json!([{ "sender": "user", "text": "" }]), Some("")),
            Conversation::from_request(&json!([{ "sender": "bot", "text": "Hello!" }]), Some("   ")),
        ];
        for conv in &cases {
            let qa = f.pipeline.answer(conv).await.unwrap();
            assert_eq!(qa.answer, REFUSAL);
            assert!(qa.standalone_query.is_none());
        }
        assert!(f.chat.calls.lock().unwrap().is_empty());
        assert_eq!(f.embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn follow_up_is_rewritten_then_answered_from_context() {
        let f = fixture(
            &["Quicksort runs in O(n log n) on average.", "Worst case is O(n^2)."],
            StubChat::default(),
        )
        .await;
        let conv = Conversation::from_request(
            &json!([
                { "sender": "user", "text": "What is quicksort?" },
                { "sender": "bot", "text": "   " },
                { "sender": "bot", "text": "A sorting algorithm..." }
            ]),
            Some("What is its complexity?"),
        );

        let qa = f.pipeline.answer(&conv).await.unwrap();
        assert_eq!(qa.answer, "O(n log n) on average.");
        assert_eq!(qa.standalone_query.as_deref(), Some(STANDALONE));
        assert!(qa.context.contains("Quicksort runs in O(n log n)"));
        assert_eq!(f.index.last_top_k.load(Ordering::SeqCst), 10);
        assert_eq!(f.embedder.calls.load(Ordering::SeqCst), 1);

        let calls = f.chat.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);

        let (p, rewrite_turns, _) = &calls[0];
        assert_eq!(*p, LlmProfile::Fast);
        assert_eq!(rewrite_turns.last().unwrap().content, "What is its complexity?");

        let (p, answer_turns, system) = &calls[1];
        assert_eq!(*p, LlmProfile::Slow);
        assert_eq!(answer_turns.last().unwrap(), &ChatTurn::user(STANDALONE));
        assert_eq!(answer_turns[0].role, ChatRole::User);
        assert!(system.contains(&qa.context));
        assert!(system.contains(REFUSAL));

        for (_, turns, _) in calls.iter() {
            assert!(turns.iter().all(|t| !t.content.trim().is_empty()));
        }
    }

    #[tokio::test]
    async fn empty_index_yields_refusal_from_generator() {
        let f = fixture(&[], StubChat::default()).await;
        let conv = Conversation::from_request(&json!([]), Some("What is a binary search tree?"));
        let qa = f.pipeline.answer(&conv).await.unwrap();
        assert!(qa.context.is_empty());
        assert_eq!(qa.answer, REFUSAL);
    }

    #[tokio::test]
    async fn empty_rewrite_stops_before_retrieval() {
        let chat = StubChat {
            rewrite: Some("  ".into()),
            ..Default::default()
        };
        let f = fixture(&["Heaps"], chat).await;
        let conv = Conversation::from_request(&json!([]), Some("And that one?"));
        let err = f.pipeline.answer(&conv).await.unwrap_err();
        assert!(matches!(err, ContextorError::EmptyRewrite));
        assert_eq!(f.embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let chat = StubChat {
            stall: true,
            ..Default::default()
        };
        let mut f = fixture(&["Heaps"], chat).await;
        f.pipeline.cfg.request_timeout = Duration::from_millis(20);
        let conv = Conversation::from_request(&json!([]), Some("What is a heap?"));
        let err = f.pipeline.answer(&conv).await.unwrap_err();
        assert!(matches!(err, ContextorError::Timeout(_)));
    }

    #[tokio::test]
    async fn concurrent_requests_keep_their_own_context() {
        let f = fixture(
            &["A heap is a complete binary tree.", "Quicksort partitions around a pivot."],
            StubChat::default(),
        )
        .await;
        let chat = Arc::new(StubChat {
            echo: true,
            ..Default::default()
        });
        let mut rag_cfg = RagConfig::new_default("http://localhost:6334", "docqa-test");
        rag_cfg.backend = VectorBackend::Memory;
        let cfg = ContextorConfig {
            top_k: 1,
            ..ContextorConfig::default()
        };
        let pipeline = RagPipeline::new(
            cfg,
            chat.clone(),
            RagStore::with_index(rag_cfg, f.index.clone()),
            Arc::new(TopicEmbedder),
        );

        let heap = Conversation::from_request(&json!([]), Some("What is a heap?"));
        let sort = Conversation::from_request(&json!([]), Some("How does quicksort work?"));
        let runs = futures::future::join_all([
            pipeline.answer(&heap),
            pipeline.answer(&sort),
            pipeline.answer(&heap),
        ])
        .await;

        let answers: Vec<QaAnswer> = runs.into_iter().map(Result::unwrap).collect();
        for qa in [&answers[0], &answers[2]] {
            assert_eq!(qa.standalone_query.as_deref(), Some("What is a heap?"));
            assert!(qa.context.contains("complete binary tree"));
            assert!(!qa.context.contains("Quicksort"));
        }
        assert_eq!(answers[1].standalone_query.as_deref(), Some("How does quicksort work?"));
        assert!(answers[1].context.contains("pivot"));
        assert!(!answers[1].context.contains("heap"));
        assert_eq!(chat.calls.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn history_ending_with_bot_reply_is_sent_whole() {
        let f = fixture(&["Quicksort partitions."], StubChat::default()).await;
        let conv = Conversation::from_request(
            &json!([
                { "sender": "user", "text": "What is quicksort?" },
                { "sender": "bot", "text": "A sorting algorithm." }
            ]),
            None,
        );
        let qa = f.pipeline.answer(&conv).await.unwrap();
        assert_eq!(qa.standalone_query.as_deref(), Some(STANDALONE));

        let calls = f.chat.calls.lock().unwrap();
        let (_, rewrite_turns, _) = &calls[0];
        assert_eq!(
            rewrite_turns,
            &vec![
                ChatTurn::user("What is quicksort?"),
                ChatTurn::model("A sorting algorithm."),
                ChatTurn::user("What is quicksort?"),
            ]
        );
        let (_, answer_turns, _) = &calls[1];
        assert_eq!(
            answer_turns,
            &vec![
                ChatTurn::user("What is quicksort?"),
                ChatTurn::model("A sorting algorithm."),
                ChatTurn::user(STANDALONE),
            ]
        );
    }
}
