//! Retrying, rate-limited chat-completion client.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::clients::openai::model_info::ModelInfo;
use crate::clients::openai::types::{ChatRequest, ChatResponse, ErrorResponse, Message, Usage};
use crate::clients::transport::{ChatTransport, TransportFailure, TransportReply};
use crate::error::CompletionError;
use crate::models::{CompletionRequest, Settings};
use crate::repos::config::EnhancerConfig;
use crate::repos::settings::SettingsRepository;
use crate::repos::usage::UsageRepository;
use crate::utils::{count_chat_tokens, count_text_tokens};

pub mod rate_limit;
pub mod retry;

pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;

use rate_limit::wait_secs;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    pub credential: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionConfig {
    pub fn from_settings(settings: &Settings, credential: String) -> Self {
        CompletionConfig {
            credential,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    pub max_requests_per_minute: usize,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            max_requests_per_minute: DEFAULT_MAX_REQUESTS_PER_MINUTE,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&EnhancerConfig> for ClientOptions {
    fn from(config: &EnhancerConfig) -> Self {
        ClientOptions {
            max_requests_per_minute: config.max_requests_per_minute,
            timeout: config.request_timeout(),
            retry: RetryPolicy::new(config.max_retries, config.retry_base_delay()),
        }
    }
}

/// Successful call details, for callers that want more than the text.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: Usage,
    pub cost: f64,
    pub attempts: u32,
}

/// Outcome of probing a credential with a minimal request.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyStatus {
    Valid,
    Invalid,
    /// The probe failed for a reason unrelated to the credential itself.
    Unverified(String),
}

pub struct CompletionClient {
    transport: Arc<dyn ChatTransport>,
    settings: SettingsRepository,
    usage: UsageRepository,
    config: RwLock<Option<CompletionConfig>>,
    limiter: RateLimiter,
    retry: RetryPolicy,
    timeout: Duration,
    /// Serializes the load-record-save cycle of the usage record.
    usage_lock: Mutex<()>,
}

impl CompletionClient {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        settings: SettingsRepository,
        usage: UsageRepository,
        options: ClientOptions,
    ) -> Self {
        CompletionClient {
            transport,
            settings,
            usage,
            config: RwLock::new(None),
            limiter: RateLimiter::new(options.max_requests_per_minute),
            retry: options.retry,
            timeout: options.timeout,
            usage_lock: Mutex::new(()),
        }
    }

    pub fn update_config(&self, config: CompletionConfig) {
        let mut guard = self.config.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(config);
    }

    /// Forgets the cached config; the next call reloads it from settings.
    pub fn clear_config(&self) {
        let mut guard = self.config.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    fn load_config(&self) -> Option<CompletionConfig> {
        let settings = match self.settings.load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings: {}", e);
                return None;
            }
        };
        let credential = match self.settings.credential() {
            Ok(credential) => credential,
            Err(e) => {
                warn!("Failed to read stored API key: {}", e);
                None
            }
        }?;
        Some(CompletionConfig::from_settings(&settings, credential))
    }

    fn resolve_config(&self) -> Result<CompletionConfig, CompletionError> {
        if let Some(config) = self
            .config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .filter(|c| !c.credential.trim().is_empty())
        {
            return Ok(config.clone());
        }

        let loaded = self
            .load_config()
            .filter(|c| !c.credential.trim().is_empty())
            .ok_or(CompletionError::CredentialMissing)?;
        debug!("Initialized completion config for model {}", loaded.model);
        self.update_config(loaded.clone());
        Ok(loaded)
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        Ok(self.complete_detailed(request).await?.text)
    }

    pub async fn complete_detailed(
        &self,
        request: &CompletionRequest,
    ) -> Result<Completion, CompletionError> {
        let config = self.resolve_config()?;

        if let Err(wait) = self.limiter.try_acquire() {
            let wait_secs = wait_secs(wait);
            warn!("Local rate limit reached, next slot in {}s", wait_secs);
            return Err(CompletionError::LocalRateLimited { wait_secs });
        }
        debug!(
            "{}/{} requests in the current window",
            self.limiter.in_window(),
            self.limiter.max_requests()
        );

        let body = ChatRequest::from_completion(
            request,
            &config.model,
            config.temperature,
            config.max_tokens,
        );

        let mut retry = 0;
        loop {
            let delay = self.retry.delay_for(retry);
            match self.attempt(&config.credential, &body, delay).await {
                Ok(response) => {
                    let attempts = retry + 1;
                    return Ok(self.finish(&body, response, attempts));
                }
                Err(e) if e.is_retryable() && retry < self.retry.max_retries => {
                    warn!(
                        "Attempt {}/{} failed ({}), retrying in {:?}",
                        retry + 1,
                        self.retry.max_attempts(),
                        e.code(),
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => {
                    error!("Completion failed after {} attempt(s): {}", retry + 1, e);
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(
        &self,
        credential: &str,
        body: &ChatRequest,
        next_delay: Duration,
    ) -> Result<ChatResponse, CompletionError> {
        let sent = tokio::time::timeout(self.timeout, self.transport.send(credential, body)).await;
        match sent {
            Err(_) | Ok(Err(TransportFailure::Timeout)) => Err(CompletionError::NetworkTimeout {
                secs: self.timeout.as_secs(),
            }),
            Ok(Err(TransportFailure::Network(msg))) => Err(CompletionError::network(msg)),
            Ok(Ok(reply)) => interpret(reply, next_delay),
        }
    }

    fn finish(&self, body: &ChatRequest, response: ChatResponse, attempts: u32) -> Completion {
        let text = response.text().unwrap_or_default().to_string();
        let model = response.model.clone().unwrap_or_else(|| body.model.clone());
        let usage = response
            .usage
            .filter(|u| u.prompt_tokens + u.completion_tokens > 0)
            .unwrap_or_else(|| estimate_usage(&body.messages, &text));

        // Price by the requested model; responses often carry a dated variant.
        if !ModelInfo::is_known(&body.model) {
            debug!("No price entry for {}, using fallback pricing", body.model);
        }
        let cost = ModelInfo::new(&body.model).cost(usage.prompt_tokens, usage.completion_tokens);
        self.record_usage(&usage, cost);
        info!(
            "Completion from {} in {} attempt(s): {} tokens, ${:.6}",
            model,
            attempts,
            usage.prompt_tokens + usage.completion_tokens,
            cost
        );

        Completion {
            text,
            model,
            usage,
            cost,
            attempts,
        }
    }

    /// Persistence failures are logged and never fail the call. The stored
    /// record is reloaded each time so outside resets are not overwritten,
    /// and an unreadable record is left as it is.
    fn record_usage(&self, usage: &Usage, cost: f64) {
        let _guard = self.usage_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut record = match self.usage.load() {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to load usage record, skipping update: {}", e);
                return;
            }
        };
        record.record(usage.prompt_tokens, usage.completion_tokens, cost, Utc::now());
        if let Err(e) = self.usage.save(&record) {
            warn!("Failed to persist usage record: {}", e);
        }
    }

    /// Sends a one-token request with `credential`. Only a 401 marks the
    /// key invalid; any other failure leaves it unverified.
    pub async fn probe(&self, credential: &str) -> KeyStatus {
        if let Err(wait) = self.limiter.try_acquire() {
            return KeyStatus::Unverified(format!(
                "local rate limit reached, retry in {}s",
                wait_secs(wait)
            ));
        }
        let model = self
            .config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|c| c.model.clone())
            .or_else(|| self.settings.load().ok().map(|s| s.model))
            .unwrap_or_else(|| Settings::default().model);
        let body = ChatRequest::new(
            model,
            vec![Message {
                role: "user".to_string(),
                content: "ping".to_string(),
            }],
            0.0,
            1,
        );

        match self.attempt(credential, &body, self.retry.delay_for(0)).await {
            Ok(_) => KeyStatus::Valid,
            Err(CompletionError::CredentialInvalid) => KeyStatus::Invalid,
            // A one-token reply can legitimately be empty.
            Err(CompletionError::EmptyResponse) => KeyStatus::Valid,
            Err(e) => KeyStatus::Unverified(e.to_string()),
        }
    }
}

fn interpret(reply: TransportReply, next_delay: Duration) -> Result<ChatResponse, CompletionError> {
    match reply.status {
        200..=299 => {
            let response = ChatResponse::from_json(&reply.body).map_err(|e| {
                warn!("Unparseable completion body: {}", e);
                CompletionError::EmptyResponse
            })?;
            if response.text().is_none() {
                return Err(CompletionError::EmptyResponse);
            }
            Ok(response)
        }
        401 => Err(CompletionError::CredentialInvalid),
        429 => Err(CompletionError::RemoteRateLimited {
            retry_after_secs: reply.retry_after.unwrap_or_else(|| wait_secs(next_delay)),
        }),
        status => {
            let message = ErrorResponse::message_from(&reply.body)
                .unwrap_or_else(|| format!("The service returned HTTP {}", status));
            Err(CompletionError::remote(status, message))
        }
    }
}

fn estimate_usage(messages: &[Message], text: &str) -> Usage {
    let prompt_tokens = count_chat_tokens(messages).unwrap_or(0) as u64;
    let completion_tokens = count_text_tokens(text).unwrap_or(0) as u64;
    Usage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;
    use crate::models::ChatMessage;
    use crate::repos::store::{AnyStore, KeyValueStore};

    enum Step {
        Reply(TransportReply),
        Fail(TransportFailure),
        Hang,
    }

    struct Call {
        at: Instant,
        credential: String,
        request: ChatRequest,
    }

    struct ScriptedTransport {
        steps: Mutex<VecDeque<Step>>,
        calls: Mutex<Vec<Call>>,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(ScriptedTransport {
                steps: Mutex::new(steps.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn gaps(&self) -> Vec<Duration> {
            let calls = self.calls.lock().unwrap();
            calls.windows(2).map(|w| w[1].at - w[0].at).collect()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(
            &self,
            credential: &str,
            request: &ChatRequest,
        ) -> Result<TransportReply, TransportFailure> {
            self.calls.lock().unwrap().push(Call {
                at: Instant::now(),
                credential: credential.to_string(),
                request: request.clone(),
            });
            let step = self
                .steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Step::Reply(ok("ROLE:\nDefault")));
            match step {
                Step::Reply(reply) => Ok(reply),
                Step::Fail(failure) => Err(failure),
                Step::Hang => std::future::pending().await,
            }
        }
    }

    /// Paused-clock timings land on millisecond ticks; allow for rounding.
    fn assert_about(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(50),
            "expected about {:?}, got {:?}",
            expected,
            actual
        );
    }

    fn ok(text: &str) -> TransportReply {
        let body = serde_json::json!({
            "id": "chatcmpl-test",
            "model": "gpt-4o-mini-2024-07-18",
            "usage": {"prompt_tokens": 1000, "completion_tokens": 500, "total_tokens": 1500},
            "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}]
        });
        TransportReply::new(200, body.to_string())
    }

    fn status(code: u16) -> Step {
        Step::Reply(TransportReply::new(code, ""))
    }

    fn config() -> CompletionConfig {
        CompletionConfig {
            credential: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new(vec![
            ChatMessage::system("Rewrite prompts."),
            ChatMessage::user("fix my bug"),
        ])
    }

    fn client_on(
        store: Arc<AnyStore>,
        transport: Arc<ScriptedTransport>,
        options: ClientOptions,
    ) -> CompletionClient {
        CompletionClient::new(
            transport,
            SettingsRepository::new(store.clone()),
            UsageRepository::new(store),
            options,
        )
    }

    fn configured(transport: Arc<ScriptedTransport>, options: ClientOptions) -> CompletionClient {
        let client = client_on(Arc::new(AnyStore::new_memory()), transport, options);
        client.update_config(config());
        client
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_attempt() {
        let transport = ScriptedTransport::new(vec![]);
        let client = client_on(
            Arc::new(AnyStore::new_memory()),
            transport.clone(),
            ClientOptions::default(),
        );

        let err = client.complete(&request()).await.unwrap_err();
        assert_eq!(err, CompletionError::CredentialMissing);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_credential_counts_as_missing() {
        let transport = ScriptedTransport::new(vec![]);
        let client = configured(transport.clone(), ClientOptions::default());
        client.update_config(CompletionConfig {
            credential: "  ".to_string(),
            ..config()
        });

        let err = client.complete(&request()).await.unwrap_err();
        assert_eq!(err, CompletionError::CredentialMissing);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_config_is_loaded_lazily_from_settings() {
        let store = Arc::new(AnyStore::new_memory());
        let settings = SettingsRepository::new(store.clone());
        let mut stored = settings.load().unwrap();
        stored.model = "gpt-4o".to_string();
        settings.save(&stored).unwrap();
        settings.set_credential("sk-from-settings").unwrap();

        let transport = ScriptedTransport::new(vec![]);
        let client = client_on(store, transport.clone(), ClientOptions::default());
        client.complete(&request()).await.unwrap();

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls[0].credential, "sk-from-settings");
        assert_eq!(calls[0].request.model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_request_overrides_reach_the_wire() {
        let transport = ScriptedTransport::new(vec![]);
        let client = configured(transport.clone(), ClientOptions::default());
        let request = request()
            .with_model("gpt-4.1")
            .with_temperature(0.1)
            .with_max_tokens(64);
        client.complete(&request).await.unwrap();

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls[0].request.model, "gpt-4.1");
        assert_eq!(calls[0].request.temperature, 0.1);
        assert_eq!(calls[0].request.max_tokens, 64);
        assert_eq!(calls[0].request.messages[0].role, "system");
        assert_eq!(calls[0].request.messages[1].content, "fix my bug");
    }

    #[tokio::test(start_paused = true)]
    async fn test_429s_within_ceiling_then_success() {
        let transport =
            ScriptedTransport::new(vec![status(429), status(429), Step::Reply(ok("done"))]);
        let client = configured(transport.clone(), ClientOptions::default());

        let completion = client.complete_detailed(&request()).await.unwrap();
        assert_eq!(completion.text, "done");
        assert_eq!(completion.attempts, 3);
        assert_eq!(transport.call_count(), 3);

        let gaps = transport.gaps();
        assert_eq!(gaps.len(), 2);
        assert_about(gaps[0], Duration::from_secs(1));
        assert_about(gaps[1], Duration::from_secs(2));
        assert!(gaps[1] >= gaps[0] * 2 - Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_429s_beyond_ceiling_fail_after_all_attempts() {
        let transport = ScriptedTransport::new((0..10).map(|_| status(429)).collect());
        let client = configured(transport.clone(), ClientOptions::default());

        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::RemoteRateLimited { .. }));
        assert_eq!(transport.call_count(), 4);
        let gaps = transport.gaps();
        assert_eq!(gaps.len(), 3);
        for (gap, secs) in gaps.iter().zip([1, 2, 4]) {
            assert_about(*gap, Duration::from_secs(secs));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_header_becomes_wait_hint() {
        let steps = (0..4)
            .map(|_| Step::Reply(TransportReply::new(429, "").with_retry_after(17)))
            .collect();
        let transport = ScriptedTransport::new(steps);
        let client = configured(transport, ClientOptions::default());

        let err = client.complete(&request()).await.unwrap_err();
        assert_eq!(err.wait_hint(), Some(17));
    }

    #[tokio::test]
    async fn test_401_fails_without_retry() {
        let transport = ScriptedTransport::new(vec![status(401), Step::Reply(ok("never"))]);
        let client = configured(transport.clone(), ClientOptions::default());

        let err = client.complete(&request()).await.unwrap_err();
        assert_eq!(err, CompletionError::CredentialInvalid);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_server_error_carries_remote_message_without_retry() {
        let transport = ScriptedTransport::new(vec![Step::Reply(TransportReply::new(
            400,
            r#"{"error": {"message": "model `x` does not exist"}}"#,
        ))]);
        let client = configured(transport.clone(), ClientOptions::default());

        let err = client.complete(&request()).await.unwrap_err();
        assert_eq!(err, CompletionError::remote(400, "model `x` does not exist"));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_server_error_without_body_gets_generic_message() {
        let transport = ScriptedTransport::new(vec![status(503)]);
        let client = configured(transport, ClientOptions::default());

        match client.complete(&request()).await.unwrap_err() {
            CompletionError::RemoteServiceError { status, message } => {
                assert_eq!(status, 503);
                assert!(message.contains("503"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_content_is_empty_response() {
        let transport = ScriptedTransport::new(vec![Step::Reply(ok("   "))]);
        let client = configured(transport.clone(), ClientOptions::default());

        assert_eq!(
            client.complete(&request()).await.unwrap_err(),
            CompletionError::EmptyResponse
        );
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_errors_are_retried() {
        let transport = ScriptedTransport::new(vec![
            Step::Fail(TransportFailure::Network("connection reset".to_string())),
            Step::Fail(TransportFailure::Network("connection reset".to_string())),
            Step::Reply(ok("recovered")),
        ]);
        let client = configured(transport.clone(), ClientOptions::default());

        assert_eq!(client.complete(&request()).await.unwrap(), "recovered");
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_errors_exhaust_to_network_error() {
        let steps = (0..4)
            .map(|_| Step::Fail(TransportFailure::Network("reset".to_string())))
            .collect();
        let transport = ScriptedTransport::new(steps);
        let client = configured(transport.clone(), ClientOptions::default());

        let err = client.complete(&request()).await.unwrap_err();
        assert_eq!(err, CompletionError::network("reset"));
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_requests_time_out_and_retry() {
        let transport = ScriptedTransport::new((0..4).map(|_| Step::Hang).collect());
        let client = configured(transport.clone(), ClientOptions::default());

        let started = Instant::now();
        let err = client.complete(&request()).await.unwrap_err();
        assert_eq!(err, CompletionError::NetworkTimeout { secs: 30 });
        assert_eq!(transport.call_count(), 4);
        // Four 30s timeouts plus 1s + 2s + 4s of backoff.
        assert_about(started.elapsed(), Duration::from_secs(127));
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_ceiling_then_window_roll() {
        let transport = ScriptedTransport::new(vec![]);
        let options = ClientOptions {
            max_requests_per_minute: 3,
            ..Default::default()
        };
        let client = configured(transport.clone(), options);

        for _ in 0..3 {
            client.complete(&request()).await.unwrap();
        }
        let err = client.complete(&request()).await.unwrap_err();
        assert_eq!(err, CompletionError::LocalRateLimited { wait_secs: 60 });
        assert_eq!(transport.call_count(), 3);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(client.complete(&request()).await.is_ok());
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_the_ceiling() {
        let transport = ScriptedTransport::new(vec![]);
        let options = ClientOptions {
            max_requests_per_minute: 3,
            ..Default::default()
        };
        let client = Arc::new(configured(transport.clone(), options));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..10 {
            let client = client.clone();
            tasks.spawn(async move { client.complete(&request()).await });
        }

        let mut ok = 0;
        let mut limited = 0;
        while let Some(result) = tasks.join_next().await {
            match result.unwrap() {
                Ok(_) => ok += 1,
                Err(CompletionError::LocalRateLimited { .. }) => limited += 1,
                Err(e) => panic!("unexpected error: {:?}", e),
            }
        }
        assert_eq!(ok, 3);
        assert_eq!(limited, 7);
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_usage_is_priced_and_persisted() {
        let store = Arc::new(AnyStore::new_memory());
        let transport = ScriptedTransport::new(vec![Step::Reply(ok("a")), Step::Reply(ok("b"))]);
        let client = client_on(store.clone(), transport, ClientOptions::default());
        client.update_config(config());

        let first = client.complete_detailed(&request()).await.unwrap();
        client.complete(&request()).await.unwrap();

        // 1000 input at $0.15/M plus 500 output at $0.60/M.
        assert!((first.cost - 0.00045).abs() < 1e-12);
        let usage = UsageRepository::new(store).load().unwrap();
        assert_eq!(usage.total_calls, 2);
        assert_eq!(usage.input_tokens, 2000);
        assert_eq!(usage.output_tokens, 1000);
        assert_eq!(usage.total_tokens, 3000);
        assert!((usage.total_cost - 0.0009).abs() < 1e-12);
        assert_eq!(usage.monthly_cost, usage.total_cost);
        assert!(!usage.month.is_empty());
    }

    #[tokio::test]
    async fn test_usage_persistence_failure_does_not_fail_the_call() {
        // A directory where the storage file should be makes every read and
        // write fail.
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(AnyStore::new_file(dir.path()));
        let transport = ScriptedTransport::new(vec![Step::Reply(ok("still fine"))]);
        let client = client_on(store, transport, ClientOptions::default());
        client.update_config(config());

        assert_eq!(client.complete(&request()).await.unwrap(), "still fine");
    }

    #[tokio::test]
    async fn test_unreadable_usage_record_is_left_untouched() {
        let store = Arc::new(AnyStore::new_memory());
        let stored = serde_json::json!({"total_calls": 500, "total_cost": 12.5, "month": 202610});
        store.set("usage", stored.clone()).unwrap();
        let transport = ScriptedTransport::new(vec![Step::Reply(ok("fine"))]);
        let client = client_on(store.clone(), transport, ClientOptions::default());
        client.update_config(config());

        assert_eq!(client.complete(&request()).await.unwrap(), "fine");
        assert_eq!(store.get("usage").unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn test_usage_reset_between_calls_is_respected() {
        let store = Arc::new(AnyStore::new_memory());
        let transport = ScriptedTransport::new(vec![Step::Reply(ok("a")), Step::Reply(ok("b"))]);
        let client = client_on(store.clone(), transport, ClientOptions::default());
        client.update_config(config());
        let usage = UsageRepository::new(store);

        client.complete(&request()).await.unwrap();
        usage.reset().unwrap();
        client.complete(&request()).await.unwrap();

        let record = usage.load().unwrap();
        assert_eq!(record.total_calls, 1);
        assert_eq!(record.input_tokens, 1000);
    }

    #[tokio::test]
    async fn test_missing_usage_is_estimated() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "ROLE:\nTester"}, "finish_reason": "stop"}]
        });
        let transport =
            ScriptedTransport::new(vec![Step::Reply(TransportReply::new(200, body.to_string()))]);
        let client = configured(transport, ClientOptions::default());

        let completion = client.complete_detailed(&request()).await.unwrap();
        assert!(completion.usage.prompt_tokens > 0);
        assert!(completion.usage.completion_tokens > 0);
        assert_eq!(completion.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_probe_outcomes() {
        let transport = ScriptedTransport::new(vec![
            Step::Reply(ok("pong")),
            status(401),
            status(500),
            Step::Fail(TransportFailure::Network("dns".to_string())),
        ]);
        let client = client_on(
            Arc::new(AnyStore::new_memory()),
            transport.clone(),
            ClientOptions::default(),
        );

        assert_eq!(client.probe("sk-good").await, KeyStatus::Valid);
        assert_eq!(client.probe("sk-bad").await, KeyStatus::Invalid);
        assert!(matches!(client.probe("sk-x").await, KeyStatus::Unverified(_)));
        assert!(matches!(client.probe("sk-x").await, KeyStatus::Unverified(_)));

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls[1].credential, "sk-bad");
        assert_eq!(calls[0].request.max_tokens, 1);
    }

    #[test]
    fn test_options_from_config() {
        let config = EnhancerConfig {
            max_requests_per_minute: 4,
            max_retries: 2,
            retry_base_delay_ms: 250,
            request_timeout_secs: 10,
            ..Default::default()
        };
        let options = ClientOptions::from(&config);
        assert_eq!(options.max_requests_per_minute, 4);
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.retry.delay_for(1), Duration::from_millis(500));
        assert_eq!(options.retry.max_retries, 2);
    }
}
