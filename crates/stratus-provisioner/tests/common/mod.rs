//! Scripted in-memory CloudFormation used by the engine tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use stratus_core::{
    Capability, DriftDetectionStatus, DriftedResource, ResourceDriftStatus, StackDriftStatus,
    StackName, StackOutput, StackStatus, TemplateError, TemplateStore,
};
use stratus_provisioner::{
    ApiError, CloudFormationApi, OnFailure, RemoteStack, StackRequest, api::BoxFuture,
};

pub fn name(s: &str) -> StackName {
    s.parse().expect("valid stack name")
}

/// Behaviour of one stack in the fake.
#[derive(Debug, Clone)]
pub struct StackScript {
    /// Whether the stack exists before anything is submitted.
    pub exists: bool,
    /// Status reported before any submission.
    pub initial_status: StackStatus,
    /// Statuses reported after a submission, one per describe. The last
    /// one repeats.
    pub statuses: VecDeque<StackStatus>,
    pub outputs: Vec<StackOutput>,
    pub drift_status: Option<StackDriftStatus>,
    /// Detection statuses, one per poll. The last one repeats.
    pub detection_statuses: VecDeque<DriftDetectionStatus>,
    pub resource_drifts: Vec<DriftedResource>,
    /// Fails every describe with this error.
    pub describe_error: Option<ApiError>,
    /// Fails describes issued after submission with this error.
    pub poll_error: Option<ApiError>,
    /// Fails create/update/detect with this error.
    pub submit_error: Option<ApiError>,
    /// Update reports "no updates are to be performed".
    pub no_updates: bool,
    /// The stack disappears after this many describes following a
    /// submission.
    pub vanish_after_polls: Option<usize>,
}

impl Default for StackScript {
    fn default() -> Self {
        Self {
            exists: false,
            initial_status: StackStatus::CreateComplete,
            statuses: VecDeque::new(),
            outputs: Vec::new(),
            drift_status: None,
            detection_statuses: VecDeque::new(),
            resource_drifts: Vec::new(),
            describe_error: None,
            poll_error: None,
            submit_error: None,
            no_updates: false,
            vanish_after_polls: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCall {
    pub stack: String,
    pub template_body: String,
    pub capabilities: Vec<Capability>,
    pub on_failure: OnFailure,
}

#[derive(Default)]
struct State {
    scripts: HashMap<String, StackScript>,
    submitted: HashMap<String, bool>,
    polls: HashMap<String, usize>,
    detections: HashMap<String, String>,
    calls: Vec<String>,
    creates: Vec<CreateCall>,
    updates: Vec<(String, Vec<Capability>)>,
}

#[derive(Default)]
pub struct FakeCloudFormation {
    state: Mutex<State>,
}

impl FakeCloudFormation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack(self, stack: &str, script: StackScript) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(stack.to_string(), script);
        self
    }

    /// Every call made, as `operation:argument`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn creates(&self) -> Vec<CreateCall> {
        self.state.lock().unwrap().creates.clone()
    }

    pub fn updates(&self) -> Vec<(String, Vec<Capability>)> {
        self.state.lock().unwrap().updates.clone()
    }

    fn describe(&self, stack: &str) -> Result<Option<RemoteStack>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("describe:{stack}"));
        let submitted = state.submitted.get(stack).copied().unwrap_or(false);
        let polls = if submitted {
            let polls = state.polls.entry(stack.to_string()).or_default();
            *polls += 1;
            *polls
        } else {
            0
        };
        let Some(script) = state.scripts.get_mut(stack) else {
            return Ok(None);
        };

        if let Some(err) = &script.describe_error {
            return Err(err.clone());
        }

        let status = if submitted {
            if let Some(err) = &script.poll_error {
                return Err(err.clone());
            }
            if script.vanish_after_polls.is_some_and(|n| polls > n) {
                return Ok(None);
            }
            next_repeating(&mut script.statuses).unwrap_or(StackStatus::CreateComplete)
        } else if script.exists {
            script.initial_status.clone()
        } else {
            return Ok(None);
        };

        Ok(Some(RemoteStack {
            stack_id: stack_id(stack),
            status,
            outputs: script.outputs.clone(),
            drift_status: script.drift_status.clone(),
        }))
    }

    fn submit(&self, operation: &str, stack: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{operation}:{stack}"));
        if let Some(err) = state
            .scripts
            .get(stack)
            .and_then(|s| s.submit_error.clone())
        {
            return Err(err);
        }
        state.submitted.insert(stack.to_string(), true);
        Ok(())
    }
}

fn next_repeating<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

pub fn stack_id(stack: &str) -> String {
    format!("arn:aws:cloudformation:us-east-1:123456789012:stack/{stack}/0001")
}

impl CloudFormationApi for FakeCloudFormation {
    fn describe_stack<'a>(
        &'a self,
        stack: &'a StackName,
    ) -> BoxFuture<'a, Result<Option<RemoteStack>, ApiError>> {
        let result = self.describe(stack.as_str());
        Box::pin(async move { result })
    }

    fn create_stack<'a>(
        &'a self,
        request: StackRequest<'a>,
        on_failure: OnFailure,
    ) -> BoxFuture<'a, Result<String, ApiError>> {
        let stack = request.stack.as_str();
        self.state.lock().unwrap().creates.push(CreateCall {
            stack: stack.to_string(),
            template_body: request.template_body.to_string(),
            capabilities: request.capabilities.to_vec(),
            on_failure,
        });
        let result = self.submit("create", stack).map(|()| stack_id(stack));
        Box::pin(async move { result })
    }

    fn update_stack<'a>(
        &'a self,
        request: StackRequest<'a>,
    ) -> BoxFuture<'a, Result<Option<String>, ApiError>> {
        let stack = request.stack.as_str();
        self.state
            .lock()
            .unwrap()
            .updates
            .push((stack.to_string(), request.capabilities.to_vec()));
        let no_updates = self
            .state
            .lock()
            .unwrap()
            .scripts
            .get(stack)
            .is_some_and(|s| s.no_updates);
        let result = self
            .submit("update", stack)
            .map(|()| (!no_updates).then(|| stack_id(stack)));
        Box::pin(async move { result })
    }

    fn detect_stack_drift<'a>(
        &'a self,
        stack: &'a StackName,
    ) -> BoxFuture<'a, Result<String, ApiError>> {
        let result = self.submit("detect", stack.as_str()).map(|()| {
            let detection_id = format!("detection-{stack}");
            let mut state = self.state.lock().unwrap();
            state.submitted.insert(stack.to_string(), false);
            state
                .detections
                .insert(detection_id.clone(), stack.to_string());
            detection_id
        });
        Box::pin(async move { result })
    }

    fn describe_drift_detection<'a>(
        &'a self,
        detection_id: &'a str,
    ) -> BoxFuture<'a, Result<DriftDetectionStatus, ApiError>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("detection_status:{detection_id}"));
        let script = match state.detections.get(detection_id).cloned() {
            Some(stack) => state.scripts.get_mut(&stack),
            None => None,
        };
        let result = match script {
            Some(script) => Ok(next_repeating(&mut script.detection_statuses)
                .unwrap_or(DriftDetectionStatus::Complete)),
            None => Err(ApiError::Service {
                code: Some("ValidationError".into()),
                message: format!("unknown detection id {detection_id}"),
            }),
        };
        drop(state);
        Box::pin(async move { result })
    }

    fn describe_resource_drifts<'a>(
        &'a self,
        stack: &'a StackName,
        filter: &'a [ResourceDriftStatus],
    ) -> BoxFuture<'a, Result<Vec<DriftedResource>, ApiError>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("resource_drifts:{stack}"));
        assert_eq!(filter, ResourceDriftStatus::REPORTABLE.as_slice());
        let drifts = state
            .scripts
            .get(stack.as_str())
            .map(|s| s.resource_drifts.clone())
            .unwrap_or_default();
        drop(state);
        Box::pin(async move { Ok(drifts) })
    }
}

/// Templates held in memory.
#[derive(Default)]
pub struct MemoryTemplates {
    bodies: HashMap<String, String>,
}

impl MemoryTemplates {
    pub fn with(mut self, stack: &str, body: &str) -> Self {
        self.bodies.insert(stack.to_string(), body.to_string());
        self
    }
}

impl TemplateStore for MemoryTemplates {
    fn stack_names(&self) -> Result<Vec<StackName>, TemplateError> {
        let mut names: Vec<_> = self.bodies.keys().map(|k| name(k)).collect();
        names.sort();
        Ok(names)
    }

    fn template_body(&self, stack: &StackName) -> Result<String, TemplateError> {
        self.bodies
            .get(stack.as_str())
            .cloned()
            .ok_or_else(|| TemplateError::NotFound {
                stack: stack.to_string(),
            })
    }
}
