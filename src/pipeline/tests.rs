use super::*;
use crate::chunker::{HeuristicOracle, OracleError, WordCountOracle};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Wraps each chunk in brackets; later chunks finish first
struct BracketSummarizer {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay_ms: u64,
}

impl BracketSummarizer {
    fn new(delay_ms: u64) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay_ms,
        }
    }
}

#[async_trait]
impl Summarizer for BracketSummarizer {
    fn name(&self) -> &str {
        "bracket"
    }

    async fn summarize(
        &self,
        text: &str,
        _length: SummaryLength,
    ) -> Result<String, SummarizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // Shorter texts sleep longer so completion order is scrambled
        let delay = self.delay_ms.saturating_sub(text.len() as u64);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(format!("[{}]", text))
    }
}

/// Fails for chunks containing `poison`
struct PoisonSummarizer {
    poison: &'static str,
}

#[async_trait]
impl Summarizer for PoisonSummarizer {
    fn name(&self) -> &str {
        "poison"
    }

    async fn summarize(
        &self,
        text: &str,
        _length: SummaryLength,
    ) -> Result<String, SummarizerError> {
        if text.contains(self.poison) {
            return Err(SummarizerError::ServerError {
                status: 400,
                body: "input rejected".to_string(),
            });
        }
        Ok(format!("<{}>", text))
    }
}

/// Returns the queued errors before succeeding
struct FlakySummarizer {
    errors: Mutex<Vec<SummarizerError>>,
    calls: AtomicUsize,
}

impl FlakySummarizer {
    fn new(errors: Vec<SummarizerError>) -> Self {
        Self {
            errors: Mutex::new(errors),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Summarizer for FlakySummarizer {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn summarize(
        &self,
        text: &str,
        _length: SummaryLength,
    ) -> Result<String, SummarizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.errors.lock().unwrap().pop();
        if let Some(err) = next {
            return Err(err);
        }
        Ok(text.to_uppercase())
    }
}

struct SlowSummarizer;

#[async_trait]
impl Summarizer for SlowSummarizer {
    fn name(&self) -> &str {
        "slow"
    }

    async fn summarize(
        &self,
        _text: &str,
        _length: SummaryLength,
    ) -> Result<String, SummarizerError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("too late".to_string())
    }
}

struct PanickingSummarizer;

#[async_trait]
impl Summarizer for PanickingSummarizer {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn summarize(
        &self,
        text: &str,
        _length: SummaryLength,
    ) -> Result<String, SummarizerError> {
        if text == "boom" {
            panic!("model crashed");
        }
        Ok(text.to_string())
    }
}

struct BrokenOracle;

impl CostOracle for BrokenOracle {
    fn cost_of(&self, _text: &str) -> Result<usize, OracleError> {
        Err(OracleError::ServerError {
            status: 503,
            body: "tokenizer unavailable".to_string(),
        })
    }
}

fn server_error(status: u16) -> SummarizerError {
    SummarizerError::ServerError {
        status,
        body: String::new(),
    }
}

fn options(concurrency: usize) -> PipelineOptions {
    PipelineOptions {
        concurrency,
        chunk_timeout: Duration::from_secs(2),
        length: SummaryLength::default(),
        retry: RetryPolicy {
            max_retries: 0,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        },
    }
}

#[tokio::test]
async fn test_empty_text_makes_no_summarizer_calls() {
    let summarizer = Arc::new(BracketSummarizer::new(0));
    let pipeline = Pipeline::new(Arc::new(WordCountOracle), summarizer.clone(), 10);

    let run = pipeline.run("").await.unwrap();
    assert!(run.chunks.is_empty());
    assert_eq!(run.outcome.text, "");
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_middle_chunk_is_skipped() {
    let pipeline = Pipeline::new(
        Arc::new(WordCountOracle),
        Arc::new(PoisonSummarizer { poison: "c" }),
        3,
    );

    let run = pipeline.run("a b c d e f").await.unwrap();
    assert_eq!(run.chunks.len(), 3);
    assert_eq!(run.outcome.text, "<a b> <e f>");
    assert_eq!(run.outcome.succeeded, vec![0, 2]);
    assert_eq!(run.outcome.failed.len(), 1);
    assert_eq!(run.outcome.failed[0].index, 1);
    assert!(run.outcome.failed[0].reason.contains("400"));
}

#[tokio::test]
async fn test_concurrent_summaries_keep_chunk_order() {
    let summarizer = Arc::new(BracketSummarizer::new(60));
    let pipeline = Pipeline::new(Arc::new(WordCountOracle), summarizer.clone(), 4)
        .with_options(options(4));

    let text = "one two three four five six seven eight nine ten eleven twelve";
    let run = pipeline.run(text).await.unwrap();

    let expected: Vec<String> = run.chunks.iter().map(|c| format!("[{}]", c.text)).collect();
    assert_eq!(run.outcome.text, expected.join(" "));
    assert_eq!(run.outcome.succeeded, (0..run.chunks.len()).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let summarizer = Arc::new(BracketSummarizer::new(30));
    let chunks: Vec<Chunk> = chunk_text(
        "a b c d e f g h i j k l m n o p",
        2,
        &WordCountOracle,
    )
    .unwrap();
    assert_eq!(chunks.len(), 16);

    let outcomes = summarize_chunks(&chunks, summarizer.clone(), &options(3)).await;
    assert_eq!(outcomes.len(), 16);
    assert!(summarizer.max_in_flight.load(Ordering::SeqCst) <= 3);
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 16);
}

#[tokio::test]
async fn test_sequential_by_default() {
    let summarizer = Arc::new(BracketSummarizer::new(10));
    let chunks = chunk_text("a b c d e f", 2, &WordCountOracle).unwrap();

    let outcomes = summarize_chunks(&chunks, summarizer.clone(), &PipelineOptions::default()).await;
    assert_eq!(outcomes.len(), 6);
    assert_eq!(summarizer.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_timeout_is_chunk_failure() {
    let chunks = chunk_text("slow words", 10, &WordCountOracle).unwrap();
    let mut opts = options(1);
    opts.chunk_timeout = Duration::from_millis(20);

    let outcomes = summarize_chunks(&chunks, Arc::new(SlowSummarizer), &opts).await;
    assert_eq!(outcomes.len(), 1);
    let reason = outcomes[0].result.as_ref().unwrap_err();
    assert!(reason.contains("Timeout"));
}

#[tokio::test]
async fn test_retries_transient_errors() {
    let summarizer = Arc::new(FlakySummarizer::new(vec![server_error(503), server_error(429)]));
    let chunks = chunk_text("retry me", 10, &WordCountOracle).unwrap();
    let mut opts = options(1);
    opts.retry.max_retries = 2;

    let outcomes = summarize_chunks(&chunks, summarizer.clone(), &opts).await;
    assert_eq!(outcomes[0].result, Ok("RETRY ME".to_string()));
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_budget_exhausted() {
    let summarizer = Arc::new(FlakySummarizer::new(vec![
        server_error(500),
        server_error(500),
        server_error(500),
    ]));
    let chunks = chunk_text("still failing", 10, &WordCountOracle).unwrap();
    let mut opts = options(1);
    opts.retry.max_retries = 1;

    let outcomes = summarize_chunks(&chunks, summarizer.clone(), &opts).await;
    assert!(outcomes[0].result.is_err());
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_non_retryable_error_not_retried() {
    let summarizer = Arc::new(FlakySummarizer::new(vec![server_error(401)]));
    let chunks = chunk_text("bad key", 10, &WordCountOracle).unwrap();
    let mut opts = options(1);
    opts.retry.max_retries = 3;

    let outcomes = summarize_chunks(&chunks, summarizer.clone(), &opts).await;
    assert!(outcomes[0].result.is_err());
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_task_is_chunk_failure() {
    let chunks = chunk_text("fine boom fine", 2, &WordCountOracle).unwrap();
    assert_eq!(chunks.len(), 3);

    let outcomes = summarize_chunks(&chunks, Arc::new(PanickingSummarizer), &options(2)).await;
    let outcome = reassemble(&outcomes);
    assert_eq!(outcome.text, "fine fine");
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].index, 1);
}

#[tokio::test]
async fn test_oracle_failure_is_fatal() {
    let pipeline = Pipeline::new(Arc::new(BrokenOracle), Arc::new(BracketSummarizer::new(0)), 10);
    let err = pipeline.run("some text").await.unwrap_err();
    assert!(matches!(err, DigestError::Chunking(_)));
}

#[tokio::test]
async fn test_pipeline_with_heuristic_oracle() {
    let summarizer = Arc::new(BracketSummarizer::new(0));
    let pipeline = Pipeline::new(Arc::new(HeuristicOracle::default()), summarizer.clone(), 16)
        .with_options(options(2));

    let text = "Associates restock shelves nightly. Labels are verified before opening.";
    let run = pipeline.run(text).await.unwrap();
    assert!(run.chunks.len() > 1);
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), run.chunks.len());
    assert!(run.outcome.failed.is_empty());
    assert_eq!(pipeline.summarizer_name(), "bracket");
}

#[tokio::test]
async fn test_run_document_end_to_end() {
    let dir = tempfile::TempDir::new().unwrap();
    let input = dir.path().join("guide.docx");
    docx::write_summary(
        &input,
        "Stocking Guide",
        &["Check labels before stocking.", "", "Rotate older stock forward."],
    )
    .unwrap();

    let pipeline = Pipeline::new(Arc::new(WordCountOracle), Arc::new(BracketSummarizer::new(0)), 5)
        .with_options(options(2));
    let run = pipeline.run_document(&input).await.unwrap();

    let words: usize = run.chunks.iter().map(|c| c.metadata.word_count).sum();
    assert_eq!(words, 10);
    assert!(run.outcome.text.starts_with("[Stocking Guide Check labels]"));
    assert!(run.outcome.failed.is_empty());
}

#[tokio::test]
async fn test_run_document_without_text_is_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let input = dir.path().join("blank.docx");
    docx::write_summary(&input, "   ", &["", "  "]).unwrap();

    let summarizer = Arc::new(BracketSummarizer::new(0));
    let pipeline = Pipeline::new(Arc::new(WordCountOracle), summarizer.clone(), 5);
    let err = pipeline.run_document(&input).await.unwrap_err();
    assert!(matches!(err, DigestError::EmptyDocument(_)));
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_run_document_missing_file_is_docx_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let pipeline = Pipeline::new(Arc::new(WordCountOracle), Arc::new(BracketSummarizer::new(0)), 5);

    let err = pipeline.run_document(&dir.path().join("absent.docx")).await.unwrap_err();
    assert!(matches!(err, DigestError::Docx(docx::DocxError::Open { .. })));
}
