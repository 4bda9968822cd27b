//! LLM provider seam.
//!
//! The pipeline talks to the model through the `LlmClient` trait so tests
//! can substitute a mock. `CallBudget` is the single process-wide counter
//! shared by classification and summarization.

use async_trait::async_trait;

use crate::error::LlmError;

/// One generation request. The digest only ever needs plain prompt-in,
/// text-out completions with a JSON response hint.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Optional system instruction, sent out-of-band from the prompt.
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: usize,
    /// Ask the provider to return `application/json`.
    pub json_response: bool,
}

impl GenerateRequest {
    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: 0.0,
            max_output_tokens: 4096,
            json_response: true,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: usize) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// A text-completion provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Perform one completion and return the raw response text.
    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError>;

    /// Provider/model name, for logging.
    fn model_name(&self) -> &str;
}

/// Hard ceiling on LLM API calls for one run, shared across stages.
///
/// Attempted calls count against the budget whether or not they succeed,
/// so a flapping API cannot burn unbounded quota.
#[derive(Debug)]
pub struct CallBudget {
    used: usize,
    max: usize,
}

impl CallBudget {
    pub fn new(max: usize) -> Self {
        Self { used: 0, max }
    }

    /// Consume one call if the budget allows it.
    pub fn try_acquire(&mut self) -> bool {
        if self.used >= self.max {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn exhausted(&self) -> bool {
        self.used >= self.max
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Scripted mock: returns canned responses in order, then errors.
    pub struct MockLlm {
        responses: Mutex<Vec<Result<String, LlmError>>>,
        pub requests: Mutex<Vec<GenerateRequest>>,
    }

    impl MockLlm {
        pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
            let mut responses = responses;
            responses.reverse(); // pop() returns them in submission order
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlm {
        async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| {
                    Err(LlmError::ApiRequest {
                        message: "mock exhausted".into(),
                    })
                })
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_acquire_until_exhausted() {
        let mut budget = CallBudget::new(2);
        assert!(budget.try_acquire());
        assert!(budget.try_acquire());
        assert!(!budget.try_acquire());
        assert!(budget.exhausted());
        assert_eq!(budget.used(), 2);
        assert_eq!(budget.max(), 2);
    }

    #[test]
    fn test_zero_budget_never_acquires() {
        let mut budget = CallBudget::new(0);
        assert!(budget.exhausted());
        assert!(!budget.try_acquire());
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn test_request_builder() {
        let req = GenerateRequest::json("hello")
            .with_system("be terse")
            .with_temperature(0.3)
            .with_max_output_tokens(8192);
        assert_eq!(req.prompt, "hello");
        assert_eq!(req.system.as_deref(), Some("be terse"));
        assert_eq!(req.temperature, 0.3);
        assert_eq!(req.max_output_tokens, 8192);
        assert!(req.json_response);
    }

    #[tokio::test]
    async fn test_mock_llm_scripted_order() {
        use test_support::MockLlm;
        let mock = MockLlm::new(vec![Ok("first".into()), Ok("second".into())]);
        assert_eq!(mock.generate(GenerateRequest::json("a")).await.unwrap(), "first");
        assert_eq!(mock.generate(GenerateRequest::json("b")).await.unwrap(), "second");
        assert!(mock.generate(GenerateRequest::json("c")).await.is_err());
        assert_eq!(mock.request_count(), 3);
    }
}
