//! Flow trait, executor and registry
//!
//! Every flow runs the same pipeline:
//! VALIDATE INPUT → [RESOLVE TOOL] → RENDER PROMPT → AWAIT PROVIDER → VALIDATE OUTPUT → DONE
//!
//! The first failing stage aborts the run with a single error. There is
//! exactly one provider call per run and no retries.

use crate::error::WanderError;
use crate::provider::{GenerateRequest, GenerateResponse, Provider};
use crate::schema::{Schema, SchemaTarget, ValidationError};
use crate::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod itinerary;
pub mod recommendations;
pub mod speech;
pub mod summarize;
pub mod translate;

pub use itinerary::ItineraryFlow;
pub use recommendations::{CoordinateRecommendationsFlow, RecommendationsFlow};
pub use speech::TextToSpeechFlow;
pub use summarize::SummarizeRecommendationsFlow;
pub use translate::TranslateAudioFlow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    ValidatingInput,
    ResolvingTool,
    RenderingPrompt,
    AwaitingProvider,
    ValidatingOutput,
    Done,
}

/// Stages a run has entered, in order
#[derive(Debug, Clone)]
pub struct FlowTrace {
    flow: &'static str,
    stages: Vec<FlowStage>,
}

impl FlowTrace {
    pub fn new(flow: &'static str) -> Self {
        Self {
            flow,
            stages: Vec::with_capacity(6),
        }
    }

    pub fn enter(&mut self, stage: FlowStage) {
        debug!(flow = self.flow, stage = ?stage, "Entering stage");
        self.stages.push(stage);
    }

    pub fn current(&self) -> Option<FlowStage> {
        self.stages.last().copied()
    }

    pub fn stages(&self) -> &[FlowStage] {
        &self.stages
    }
}

/// A completed flow invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRun<T> {
    pub run_id: Uuid,
    pub flow: String,
    pub output: T,
    pub trace: Vec<FlowStage>,
    pub elapsed_ms: u64,
}

impl<T: Serialize> FlowRun<T> {
    pub fn into_json(self) -> Result<FlowRun<Value>> {
        Ok(FlowRun {
            run_id: self.run_id,
            flow: self.flow,
            output: serde_json::to_value(self.output)?,
            trace: self.trace,
            elapsed_ms: self.elapsed_ms,
        })
    }
}

/// One request/response use case
#[async_trait]
pub trait Flow: Send + Sync {
    type Input: Serialize + DeserializeOwned + Send + Sync;
    type Output: Serialize + DeserializeOwned + Send + Sync;

    fn name(&self) -> &'static str;
    fn input_schema(&self) -> &Schema;
    fn output_schema(&self) -> &Schema;

    /// Resolve any tool and render the prompt. Implementations enter the
    /// `ResolvingTool` / `RenderingPrompt` stages themselves.
    async fn build_request(&self, input: &Self::Input, trace: &mut FlowTrace) -> Result<GenerateRequest>;

    /// Turn the provider response into the value checked against `output_schema`
    fn decode(&self, response: GenerateResponse) -> Result<Value> {
        match response {
            GenerateResponse::Json(value) => Ok(value),
            GenerateResponse::Media { mime_type, .. } => Err(WanderError::provider(format!(
                "expected JSON output, received media ({})",
                mime_type
            ))),
        }
    }

    /// Checks relating output to input, after the output schema passed
    fn verify(&self, _input: &Self::Input, _output: &Self::Output) -> std::result::Result<(), ValidationError> {
        Ok(())
    }
}

/// Run a flow on a raw JSON input
pub async fn execute<F: Flow>(flow: &F, provider: &dyn Provider, input: Value) -> Result<FlowRun<F::Output>> {
    let run_id = Uuid::new_v4();
    let start = Instant::now();
    let mut trace = FlowTrace::new(flow.name());

    info!(%run_id, flow = flow.name(), "Flow started");

    match run_stages(flow, provider, input, &mut trace).await {
        Ok(output) => {
            trace.enter(FlowStage::Done);
            let elapsed_ms = start.elapsed().as_millis() as u64;
            info!(%run_id, flow = flow.name(), elapsed_ms, "Flow completed");
            Ok(FlowRun {
                run_id,
                flow: flow.name().to_string(),
                output,
                trace: trace.stages().to_vec(),
                elapsed_ms,
            })
        }
        Err(e) => {
            warn!(
                %run_id,
                flow = flow.name(),
                stage = ?trace.current(),
                "Flow failed: {}",
                e
            );
            Err(e)
        }
    }
}

async fn run_stages<F: Flow>(
    flow: &F,
    provider: &dyn Provider,
    input: Value,
    trace: &mut FlowTrace,
) -> Result<F::Output> {
    trace.enter(FlowStage::ValidatingInput);
    let input: F::Input = flow.input_schema().narrow(SchemaTarget::Input, input)?;

    let request = flow.build_request(&input, trace).await?;

    trace.enter(FlowStage::AwaitingProvider);
    let response = provider.generate(request).await?;

    trace.enter(FlowStage::ValidatingOutput);
    let value = flow.decode(response)?;
    let output: F::Output = flow.output_schema().narrow(SchemaTarget::Output, value)?;
    flow.verify(&input, &output)?;

    Ok(output)
}

/// Type-erased flow, for lookup by name
#[async_trait]
pub trait DynFlow: Send + Sync {
    fn id(&self) -> &'static str;
    fn describe(&self) -> FlowDescriptor;
    async fn invoke(&self, provider: &dyn Provider, input: Value) -> Result<FlowRun<Value>>;
}

#[async_trait]
impl<F: Flow> DynFlow for F {
    fn id(&self) -> &'static str {
        Flow::name(self)
    }

    fn describe(&self) -> FlowDescriptor {
        FlowDescriptor {
            name: Flow::name(self).to_string(),
            input_schema: self.input_schema().to_provider_schema(),
            output_schema: self.output_schema().to_provider_schema(),
        }
    }

    async fn invoke(&self, provider: &dyn Provider, input: Value) -> Result<FlowRun<Value>> {
        execute(self, provider, input).await?.into_json()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDescriptor {
    pub name: String,
    pub input_schema: Value,
    pub output_schema: Value,
}

/// Flow registry for looking up and invoking flows by name
#[derive(Clone)]
pub struct FlowRegistry {
    flows: HashMap<String, Arc<dyn DynFlow>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self {
            flows: HashMap::new(),
        }
    }

    pub fn register(&mut self, flow: Arc<dyn DynFlow>) {
        self.flows.insert(flow.id().to_string(), flow);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DynFlow>> {
        self.flows.get(name).cloned()
    }

    /// Flow names, sorted
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.flows.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn describe(&self) -> Vec<FlowDescriptor> {
        self.list()
            .into_iter()
            .filter_map(|name| self.flows.get(name))
            .map(|flow| flow.describe())
            .collect()
    }

    pub async fn invoke(&self, provider: &dyn Provider, name: &str, input: Value) -> Result<FlowRun<Value>> {
        let flow = self
            .get(name)
            .ok_or_else(|| WanderError::FlowNotFound(name.to_string()))?;
        flow.invoke(provider, input).await
    }
}

impl Default for FlowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{PromptRenderer, PromptTemplate};
    use crate::provider::{ModelRole, OutputSpec, ScriptedProvider};
    use crate::schema::Field;
    use serde_json::json;

    const ECHO: PromptTemplate = PromptTemplate::new("echo", "Say {{{word}}}");

    #[derive(Debug, Serialize, Deserialize)]
    struct EchoIn {
        word: String,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct EchoOut {
        reply: String,
    }

    struct EchoFlow {
        renderer: PromptRenderer,
        input: Schema,
        output: Schema,
    }

    impl EchoFlow {
        fn new() -> Self {
            Self {
                renderer: PromptRenderer::new(),
                input: Schema::object(vec![Field::required("word", Schema::non_blank_text(), "")]),
                output: Schema::object(vec![Field::required("reply", Schema::non_blank_text(), "")]),
            }
        }
    }

    #[async_trait]
    impl Flow for EchoFlow {
        type Input = EchoIn;
        type Output = EchoOut;

        fn name(&self) -> &'static str {
            "echo"
        }

        fn input_schema(&self) -> &Schema {
            &self.input
        }

        fn output_schema(&self) -> &Schema {
            &self.output
        }

        async fn build_request(&self, input: &EchoIn, trace: &mut FlowTrace) -> Result<GenerateRequest> {
            trace.enter(FlowStage::RenderingPrompt);
            Ok(GenerateRequest {
                flow: "echo",
                model: ModelRole::Text,
                prompt: self.renderer.render(&ECHO, input)?,
                output: OutputSpec::Json(self.output.to_provider_schema()),
            })
        }
    }

    #[tokio::test]
    async fn test_execute_records_stages() {
        let provider = ScriptedProvider::with_json(json!({ "reply": "hi" }));
        let run = execute(&EchoFlow::new(), &provider, json!({ "word": "hi" }))
            .await
            .unwrap();

        assert_eq!(run.output, EchoOut { reply: "hi".to_string() });
        assert_eq!(
            run.trace,
            vec![
                FlowStage::ValidatingInput,
                FlowStage::RenderingPrompt,
                FlowStage::AwaitingProvider,
                FlowStage::ValidatingOutput,
                FlowStage::Done,
            ]
        );
        assert_eq!(provider.requests()[0].prompt.text_content(), "Say hi");
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_provider() {
        let provider = ScriptedProvider::with_json(json!({ "reply": "hi" }));
        let err = execute(&EchoFlow::new(), &provider, json!({ "word": "" }))
            .await
            .unwrap_err();

        match err {
            WanderError::Validation(e) => {
                assert_eq!(e.target, SchemaTarget::Input);
                assert!(e.names("word"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_output_is_rejected() {
        let provider = ScriptedProvider::with_json(json!({ "reply": 42 }));
        let err = execute(&EchoFlow::new(), &provider, json!({ "word": "hi" }))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WanderError::Validation(ValidationError { target: SchemaTarget::Output, .. })
        ));
    }

    #[tokio::test]
    async fn test_media_response_rejected_for_json_flow() {
        let provider = ScriptedProvider::new();
        provider.push(Ok(GenerateResponse::Media {
            mime_type: "audio/wav".to_string(),
            data: String::new(),
        }));
        let err = execute(&EchoFlow::new(), &provider, json!({ "word": "hi" }))
            .await
            .unwrap_err();
        assert!(matches!(err, WanderError::Provider(_)));
    }

    #[tokio::test]
    async fn test_registry_lookup_and_invoke() {
        let mut registry = FlowRegistry::new();
        registry.register(Arc::new(EchoFlow::new()));
        assert_eq!(registry.list(), vec!["echo"]);
        assert_eq!(registry.describe()[0].input_schema["required"], json!(["word"]));

        let provider = ScriptedProvider::with_json(json!({ "reply": "yo" }));
        let run = registry
            .invoke(&provider, "echo", json!({ "word": "yo" }))
            .await
            .unwrap();
        assert_eq!(run.output, json!({ "reply": "yo" }));

        let missing = registry.invoke(&provider, "nope", json!({})).await.unwrap_err();
        assert!(matches!(missing, WanderError::FlowNotFound(_)));
    }
}
