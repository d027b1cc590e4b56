mod common;

use std::sync::Arc;

use approx::assert_relative_eq;
use common::*;
use llm_eval_core::{JobId, JobStatus, JobStore, MetricConfig, ValidatorSpec};
use llm_eval_inference::{CapabilityRegistry, InferenceConfig, StreamingInferenceClient};
use llm_eval_storage::InMemoryJobStore;
use llm_eval_workflow::{ConfiguredClientFactory, JobFatalError, JobRunner, RunOutcome};
use pretty_assertions::assert_eq;

const MODEL: &str = "llama-3.3-70b-versatile";

#[tokio::test]
async fn test_all_items_pass_without_validators() {
    let store = Arc::new(InMemoryJobStore::new());
    let provider = Arc::new(FakeProvider::new());
    let job = new_job(MODEL, &["one", "two", "three"], MetricConfig::default());
    let id = stored_job(store.as_ref(), &job).await;

    let outcome = runner(store.clone(), client(provider.clone())).run(id).await.unwrap();

    assert_eq!(outcome, RunOutcome::Finished(JobStatus::Completed));
    let job = store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.completed_items, 3);
    assert_eq!(job.results.len(), 3);
    assert_eq!(job.pass_rate, Some(1.0));
    assert_relative_eq!(job.avg_perplexity.unwrap(), 0.5f64.exp(), epsilon = 1e-12);
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());
    assert!(job.error_message.is_none());
    assert!(provider.requests().iter().all(|r| r.probability_detail));
}

#[tokio::test]
async fn test_items_run_in_input_order() {
    let store = Arc::new(InMemoryJobStore::new());
    let provider = Arc::new(FakeProvider::new());
    let job = new_job(MODEL, &["a", "b", "c"], MetricConfig::default());
    let id = stored_job(store.as_ref(), &job).await;

    runner(store.clone(), client(provider.clone())).run(id).await.unwrap();

    let prompts: Vec<String> = provider.requests().into_iter().map(|r| r.user_prompt).collect();
    assert_eq!(prompts, vec!["a", "b", "c"]);
    let job = store.get(&id).await.unwrap().unwrap();
    let inputs: Vec<&str> = job.results.iter().map(|r| r.input_prompt.as_str()).collect();
    assert_eq!(inputs, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_malformed_structured_output_fails_only_that_item() {
    let store = Arc::new(InMemoryJobStore::new());
    let provider = Arc::new(
        FakeProvider::new()
            .reply("first", Reply::Tokens(vec![("{\"a\":", -0.1), (" 1}", -0.2)]))
            .reply("second", Reply::Tokens(vec![("not", -0.3), (" json", -0.4)]))
            .reply("third", Reply::Tokens(vec![("[1, 2]", -0.1)])),
    );
    let job = new_job(MODEL, &["first", "second", "third"], MetricConfig::from_flags(true, None));
    let id = stored_job(store.as_ref(), &job).await;

    runner(store.clone(), client(provider)).run(id).await.unwrap();

    let job = store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    let passed: Vec<bool> = job.results.iter().map(|r| r.passed).collect();
    assert_eq!(passed, vec![true, false, true]);

    let second = &job.results[1];
    assert_eq!(second.output, "not json");
    let reason = second.failure_reason.as_deref().unwrap();
    assert!(reason.starts_with("Invalid JSON: "), "{}", reason);
    assert_relative_eq!(job.pass_rate.unwrap(), 2.0 / 3.0);
}

#[tokio::test]
async fn test_capability_rejection_is_recovered_inside_the_item() {
    let store = Arc::new(InMemoryJobStore::new());
    let provider = Arc::new(
        FakeProvider::new()
            .rejecting_detail()
            .reply("hello", Reply::Tokens(vec![("Hi", -0.7), (" there", -0.7)])),
    );
    let registry = Arc::new(CapabilityRegistry::empty());
    let client = StreamingInferenceClient::new(provider.clone(), registry.clone());
    let job = new_job("model-x", &["hello", "again"], MetricConfig::default());
    let id = stored_job(store.as_ref(), &job).await;

    runner(store.clone(), client).run(id).await.unwrap();

    let job = store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.results[0].output, "Hi there");
    assert!(job.results.iter().all(|r| r.passed));
    assert!(!registry.supports_probability_detail("model-x"));

    // One rejected attempt, then every later request goes without detail.
    let detail: Vec<bool> = provider.requests().iter().map(|r| r.probability_detail).collect();
    assert_eq!(detail, vec![true, false, false]);

    // Fallback tokens carry the default log-probability.
    assert_relative_eq!(job.avg_perplexity.unwrap(), 0.1f64.exp(), epsilon = 1e-12);
}

#[tokio::test]
async fn test_second_checkpoint_failure_fails_job() {
    // Update calls: 1 = start, 2 = first checkpoint, 3 = second checkpoint.
    let store = Arc::new(FailingStore::new().failing_on_update(3, "connection reset"));
    let provider = Arc::new(FakeProvider::new());
    let job = new_job(MODEL, &["a", "b", "c"], MetricConfig::default());
    let id = stored_job(store.as_ref(), &job).await;

    let outcome = runner(store.clone(), client(provider.clone())).run(id).await.unwrap();

    assert_eq!(outcome, RunOutcome::Finished(JobStatus::Failed));
    let job = store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_message, Some(store.error().to_string()));
    assert_eq!(job.completed_items, 1);
    assert_eq!(job.results.len(), 1);
    assert!(job.completed_at.is_some());
    assert!(job.pass_rate.is_none());
    assert_eq!(provider.requests().len(), 2);
}

#[tokio::test]
async fn test_empty_job_completes_immediately() {
    let store = Arc::new(InMemoryJobStore::new());
    let provider = Arc::new(FakeProvider::new());
    let job = new_job(MODEL, &[], MetricConfig::default());
    let id = stored_job(store.as_ref(), &job).await;

    runner(store.clone(), client(provider.clone())).run(id).await.unwrap();

    let job = store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.total_items, 0);
    assert_eq!(job.pass_rate, Some(0.0));
    assert_eq!(job.avg_latency_ms, Some(0.0));
    assert_eq!(job.avg_perplexity, None);
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn test_stream_error_is_isolated_to_item() {
    let store = Arc::new(InMemoryJobStore::new());
    let provider = Arc::new(
        FakeProvider::new().reply("flaky", Reply::BreaksAfter(vec!["par", "tial"], "upstream hiccup")),
    );
    let job = new_job(MODEL, &["ok", "flaky", "ok again"], MetricConfig::default());
    let id = stored_job(store.as_ref(), &job).await;

    runner(store.clone(), client(provider)).run(id).await.unwrap();

    let job = store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.completed_items, 3);

    let failed = &job.results[1];
    assert!(!failed.passed);
    assert_eq!(failed.output, "");
    assert_eq!(failed.latency_ms, 0.0);
    assert_eq!(
        failed.failure_reason.as_deref(),
        Some("Provider error: 500 - upstream hiccup")
    );
    assert_relative_eq!(job.pass_rate.unwrap(), 2.0 / 3.0);
}

#[tokio::test]
async fn test_invalid_validator_config_fails_item_not_job() {
    let store = Arc::new(InMemoryJobStore::new());
    let config = MetricConfig::new(vec![ValidatorSpec::LengthTolerance {
        expected_length: 10,
        tolerance: -1.0,
    }]);
    let job = new_job(MODEL, &["a", "b"], config);
    let id = stored_job(store.as_ref(), &job).await;

    runner(store.clone(), client(Arc::new(FakeProvider::new()))).run(id).await.unwrap();

    let job = store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.results.iter().all(|r| !r.passed));
    assert!(job.results[0]
        .failure_reason
        .as_deref()
        .unwrap()
        .contains("tolerance"));
    assert_eq!(job.pass_rate, Some(0.0));
}

#[tokio::test]
async fn test_progress_is_checkpointed_after_every_item() {
    let store = Arc::new(FailingStore::new());
    let job = new_job(MODEL, &["a", "b", "c"], MetricConfig::default());
    let id = stored_job(store.as_ref(), &job).await;

    runner(store.clone(), client(Arc::new(FakeProvider::new()))).run(id).await.unwrap();

    assert_eq!(
        store.history(),
        vec![
            (JobStatus::Processing, 0, 0),
            (JobStatus::Processing, 1, 1),
            (JobStatus::Processing, 2, 2),
            (JobStatus::Processing, 3, 3),
            (JobStatus::Completed, 3, 3),
        ]
    );
}

#[tokio::test]
async fn test_missing_credential_fails_job_before_any_item() {
    let store = Arc::new(InMemoryJobStore::new());
    let config = InferenceConfig {
        api_key: None,
        ..Default::default()
    };
    let factory = ConfiguredClientFactory::new(config, Arc::new(CapabilityRegistry::new()));
    let job = new_job(MODEL, &["a", "b"], MetricConfig::default());
    let id = stored_job(store.as_ref(), &job).await;

    let outcome = JobRunner::new(store.clone(), Arc::new(factory)).run(id).await.unwrap();

    assert_eq!(outcome, RunOutcome::Finished(JobStatus::Failed));
    let job = store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.completed_items, 0);
    assert!(job.error_message.unwrap().contains("GROQ_API_KEY"));
}

#[tokio::test]
async fn test_unknown_job_is_left_alone() {
    let store = Arc::new(InMemoryJobStore::new());
    let outcome = runner(store, client(Arc::new(FakeProvider::new())))
        .run(JobId::new())
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::NotFound);
}

#[tokio::test]
async fn test_terminal_job_is_not_rerun() {
    let store = Arc::new(InMemoryJobStore::new());
    let provider = Arc::new(FakeProvider::new());
    let job = new_job(MODEL, &["a"], MetricConfig::default());
    let id = stored_job(store.as_ref(), &job).await;
    let runner = runner(store.clone(), client(provider.clone()));
    runner.run(id).await.unwrap();

    let outcome = runner.run(id).await.unwrap();

    assert_eq!(outcome, RunOutcome::NotPending(JobStatus::Completed));
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn test_final_write_failure_fails_job() {
    // Update calls: 1 = start, 2 = checkpoint, 3 = completion.
    let store = Arc::new(FailingStore::new().failing_on_update(3, "disk full"));
    let job = new_job(MODEL, &["a"], MetricConfig::default());
    let id = stored_job(store.as_ref(), &job).await;

    let outcome = runner(store.clone(), client(Arc::new(FakeProvider::new()))).run(id).await;

    assert_eq!(outcome.unwrap(), RunOutcome::Finished(JobStatus::Failed));
    let job = store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.completed_items, 1);
    assert!(job.pass_rate.is_none());

    let err = JobFatalError::from(store.error());
    assert_eq!(job.error_message, Some(err.to_string()));
}
