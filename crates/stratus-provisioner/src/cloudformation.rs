//! `CloudFormationApi` over the AWS SDK.

use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types::{
    Capability as SdkCapability, OnFailure as SdkOnFailure, PropertyDifference, Stack,
    StackDriftDetectionStatus, StackDriftStatus as SdkStackDriftStatus, StackResourceDrift,
    StackResourceDriftStatus, StackStatus as SdkStackStatus,
};
use stratus_core::{
    Capability, DifferenceType, DriftDetectionStatus, DriftedResource, PropertyDiff,
    ResourceDriftStatus, StackDriftStatus, StackName, StackOutput, StackStatus,
};

use crate::api::{ApiError, BoxFuture, CloudFormationApi, OnFailure, RemoteStack, StackRequest};
use crate::error::format_err_chain;

/// Error codes that mean the caller could not authenticate or is not allowed.
const AUTH_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "ExpiredToken",
    "ExpiredTokenException",
    "InvalidClientTokenId",
    "MissingAuthenticationToken",
    "SignatureDoesNotMatch",
    "UnrecognizedClientException",
];

pub struct CloudFormationClient {
    client: Client,
}

impl CloudFormationClient {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

impl CloudFormationApi for CloudFormationClient {
    fn describe_stack<'a>(
        &'a self,
        stack: &'a StackName,
    ) -> BoxFuture<'a, Result<Option<RemoteStack>, ApiError>> {
        Box::pin(async move {
            match self
                .client
                .describe_stacks()
                .stack_name(stack.as_str())
                .send()
                .await
            {
                Ok(resp) => Ok(resp.stacks().first().map(remote_stack)),
                Err(e) => {
                    let err = classify(e);
                    if err.is_stack_missing() {
                        Ok(None)
                    } else {
                        Err(err)
                    }
                }
            }
        })
    }

    fn create_stack<'a>(
        &'a self,
        request: StackRequest<'a>,
        on_failure: OnFailure,
    ) -> BoxFuture<'a, Result<String, ApiError>> {
        Box::pin(async move {
            let resp = self
                .client
                .create_stack()
                .stack_name(request.stack.as_str())
                .template_body(request.template_body)
                .set_capabilities(Some(sdk_capabilities(request.capabilities)))
                .on_failure(sdk_on_failure(on_failure))
                .send()
                .await
                .map_err(classify)?;

            Ok(text(resp.stack_id()))
        })
    }

    fn update_stack<'a>(
        &'a self,
        request: StackRequest<'a>,
    ) -> BoxFuture<'a, Result<Option<String>, ApiError>> {
        Box::pin(async move {
            let result = self
                .client
                .update_stack()
                .stack_name(request.stack.as_str())
                .template_body(request.template_body)
                .set_capabilities(Some(sdk_capabilities(request.capabilities)))
                .send()
                .await;

            match result {
                Ok(resp) => Ok(Some(text(resp.stack_id()))),
                Err(e) => {
                    let err = classify(e);
                    if err.is_no_updates() {
                        Ok(None)
                    } else {
                        Err(err)
                    }
                }
            }
        })
    }

    fn detect_stack_drift<'a>(
        &'a self,
        stack: &'a StackName,
    ) -> BoxFuture<'a, Result<String, ApiError>> {
        Box::pin(async move {
            let resp = self
                .client
                .detect_stack_drift()
                .stack_name(stack.as_str())
                .send()
                .await
                .map_err(classify)?;

            let detection_id = text(resp.stack_drift_detection_id());
            if detection_id.is_empty() {
                return Err(ApiError::Service {
                    code: None,
                    message: "DetectStackDrift returned no detection id".into(),
                });
            }
            Ok(detection_id)
        })
    }

    fn describe_drift_detection<'a>(
        &'a self,
        detection_id: &'a str,
    ) -> BoxFuture<'a, Result<DriftDetectionStatus, ApiError>> {
        Box::pin(async move {
            let resp = self
                .client
                .describe_stack_drift_detection_status()
                .stack_drift_detection_id(detection_id)
                .send()
                .await
                .map_err(classify)?;

            let status = Option::<&StackDriftDetectionStatus>::from(resp.detection_status());
            Ok(DriftDetectionStatus::from_wire(
                wire(status),
                resp.detection_status_reason(),
            ))
        })
    }

    fn describe_resource_drifts<'a>(
        &'a self,
        stack: &'a StackName,
        filter: &'a [ResourceDriftStatus],
    ) -> BoxFuture<'a, Result<Vec<DriftedResource>, ApiError>> {
        Box::pin(async move {
            let filters: Vec<StackResourceDriftStatus> = filter
                .iter()
                .map(|s| StackResourceDriftStatus::from(s.as_str()))
                .collect();

            let mut drifts = Vec::new();
            let mut next_token = None;
            loop {
                let resp = self
                    .client
                    .describe_stack_resource_drifts()
                    .stack_name(stack.as_str())
                    .set_stack_resource_drift_status_filters(Some(filters.clone()))
                    .set_next_token(next_token.take())
                    .send()
                    .await
                    .map_err(classify)?;

                drifts.extend(resp.stack_resource_drifts().iter().map(drifted_resource));

                match resp.next_token() {
                    Some(token) => next_token = Some(token.to_string()),
                    None => break,
                }
            }

            tracing::debug!(stack = %stack, count = drifts.len(), "fetched resource drifts");
            Ok(drifts)
        })
    }
}

/// Sort an SDK failure into the engine's three error kinds.
fn classify<E, R>(err: SdkError<E, R>) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::ServiceError(_) => {
            let code = err.code().map(String::from);
            let message = err
                .message()
                .map(String::from)
                .unwrap_or_else(|| format_err_chain(&err));
            classify_service(code, message)
        }
        _ => ApiError::Transport(format_err_chain(&err)),
    }
}

fn classify_service(code: Option<String>, message: String) -> ApiError {
    match code {
        Some(code) if AUTH_CODES.contains(&code.as_str()) => ApiError::Auth { code, message },
        code => ApiError::Service { code, message },
    }
}

fn remote_stack(stack: &Stack) -> RemoteStack {
    let status = Option::<&SdkStackStatus>::from(stack.stack_status());
    let drift_status = stack
        .drift_information()
        .and_then(|info| Option::<&SdkStackDriftStatus>::from(info.stack_drift_status()))
        .map(|s| StackDriftStatus::from(s.as_str()));

    RemoteStack {
        stack_id: text(stack.stack_id()),
        status: StackStatus::from(wire(status)),
        outputs: stack
            .outputs()
            .iter()
            .map(|o| StackOutput {
                key: text(o.output_key()),
                value: text(o.output_value()),
            })
            .collect(),
        drift_status,
    }
}

fn drifted_resource(drift: &StackResourceDrift) -> DriftedResource {
    let status = Option::<&StackResourceDriftStatus>::from(drift.stack_resource_drift_status());

    DriftedResource {
        logical_id: text(drift.logical_resource_id()),
        physical_id: text(drift.physical_resource_id()),
        resource_type: text(drift.resource_type()),
        drift_status: ResourceDriftStatus::from(wire(status)),
        property_diffs: drift
            .property_differences()
            .iter()
            .map(property_diff)
            .collect(),
    }
}

fn property_diff(diff: &PropertyDifference) -> PropertyDiff {
    let kind = Option::<&aws_sdk_cloudformation::types::DifferenceType>::from(diff.difference_type());

    PropertyDiff {
        property_path: text(diff.property_path()),
        expected_value: text(diff.expected_value()),
        actual_value: text(diff.actual_value()),
        difference_type: DifferenceType::from(wire(kind)),
    }
}

fn sdk_capabilities(capabilities: &[Capability]) -> Vec<SdkCapability> {
    capabilities
        .iter()
        .map(|c| match c {
            Capability::Iam => SdkCapability::CapabilityIam,
            Capability::NamedIam => SdkCapability::CapabilityNamedIam,
            Capability::AutoExpand => SdkCapability::CapabilityAutoExpand,
        })
        .collect()
}

fn sdk_on_failure(on_failure: OnFailure) -> SdkOnFailure {
    match on_failure {
        OnFailure::Rollback => SdkOnFailure::Rollback,
    }
}

/// Owned copy of a string member, required or optional in the SDK model.
fn text<'a>(value: impl Into<Option<&'a str>>) -> String {
    value.into().unwrap_or_default().to_string()
}

/// Wire form of an SDK enum member, empty when absent.
fn wire<T: AsRef<str>>(value: Option<&T>) -> &str {
    value.map(|v| v.as_ref()).unwrap_or("")
}
