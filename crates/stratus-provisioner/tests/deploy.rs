mod common;

use std::collections::VecDeque;
use std::time::Duration;

use common::{FakeCloudFormation, MemoryTemplates, StackScript, name, stack_id};
use stratus_core::{Capability, StackOutput, StackStatus};
use stratus_provisioner::{ApiError, Deployer, OnFailure, PollPolicy, ProvisionerError};
use tokio_util::sync::CancellationToken;

const TEMPLATE: &str = r#"{"Resources":{"Queue":{"Type":"AWS::SQS::Queue"}}}"#;

fn statuses(list: &[StackStatus]) -> VecDeque<StackStatus> {
    list.iter().cloned().collect()
}

fn output(key: &str, value: &str) -> StackOutput {
    StackOutput {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn throttled() -> ApiError {
    ApiError::Transport("dispatch failure: connection reset".to_string())
}

#[tokio::test(start_paused = true)]
async fn creates_missing_stack_and_collects_outputs() {
    let api = FakeCloudFormation::new().with_stack(
        "Api",
        StackScript {
            statuses: statuses(&[StackStatus::CreateInProgress, StackStatus::CreateComplete]),
            outputs: vec![output("Url", "https://x")],
            ..Default::default()
        },
    );
    let templates = MemoryTemplates::default().with("Api", TEMPLATE);
    let deployer = Deployer::new(&api, &templates, CancellationToken::new());

    let outcome = deployer.deploy(&name("Api")).await.unwrap();

    assert_eq!(outcome.stack, name("Api"));
    assert_eq!(outcome.stack_id, stack_id("Api"));
    assert_eq!(outcome.status, StackStatus::CreateComplete);
    assert_eq!(outcome.outputs, vec![output("Url", "https://x")]);

    let creates = api.creates();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].template_body, TEMPLATE);
    assert_eq!(
        creates[0].capabilities,
        vec![Capability::Iam, Capability::NamedIam, Capability::AutoExpand]
    );
    assert_eq!(creates[0].on_failure, OnFailure::Rollback);
    assert_eq!(api.count("update:"), 0);
}

#[tokio::test(start_paused = true)]
async fn updates_existing_stack() {
    let api = FakeCloudFormation::new().with_stack(
        "Api",
        StackScript {
            exists: true,
            initial_status: StackStatus::UpdateComplete,
            statuses: statuses(&[StackStatus::UpdateInProgress, StackStatus::UpdateComplete]),
            ..Default::default()
        },
    );
    let templates = MemoryTemplates::default().with("Api", TEMPLATE);
    let deployer = Deployer::new(&api, &templates, CancellationToken::new());

    let outcome = deployer.deploy(&name("Api")).await.unwrap();

    assert_eq!(outcome.status, StackStatus::UpdateComplete);
    assert!(api.creates().is_empty());
    assert_eq!(
        api.updates(),
        vec![("Api".to_string(), Capability::ALL.to_vec())]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_update_reports_status_and_skips_outputs() {
    let api = FakeCloudFormation::new().with_stack(
        "Db",
        StackScript {
            exists: true,
            statuses: statuses(&[
                StackStatus::UpdateInProgress,
                StackStatus::UpdateRollbackInProgress,
                StackStatus::UpdateRollbackFailed,
            ]),
            outputs: vec![output("Endpoint", "db.internal")],
            ..Default::default()
        },
    );
    let templates = MemoryTemplates::default().with("Db", TEMPLATE);
    let deployer = Deployer::new(&api, &templates, CancellationToken::new());

    let err = deployer.deploy(&name("Db")).await.unwrap_err();

    match err {
        ProvisionerError::OperationFailed { stack, status } => {
            assert_eq!(stack, name("Db"));
            assert_eq!(status, StackStatus::UpdateRollbackFailed);
        }
        other => panic!("expected OperationFailed, got {other:?}"),
    }
    // existence check plus three polls; no outputs read afterwards
    assert_eq!(api.count("describe:"), 4);
}

#[tokio::test(start_paused = true)]
async fn outputs_keep_service_order_and_may_be_empty() {
    let api = FakeCloudFormation::new()
        .with_stack(
            "Web",
            StackScript {
                outputs: vec![output("Zeta", "1"), output("Alpha", "2"), output("Mid", "3")],
                ..Default::default()
            },
        )
        .with_stack("Empty", StackScript::default());
    let templates = MemoryTemplates::default()
        .with("Web", TEMPLATE)
        .with("Empty", TEMPLATE);
    let deployer = Deployer::new(&api, &templates, CancellationToken::new());

    let web = deployer.deploy(&name("Web")).await.unwrap();
    let keys: Vec<_> = web.outputs.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, ["Zeta", "Alpha", "Mid"]);

    let empty = deployer.deploy(&name("Empty")).await.unwrap();
    assert!(empty.outputs.is_empty());
}

#[tokio::test(start_paused = true)]
async fn existence_check_failure_submits_nothing() {
    let api = FakeCloudFormation::new().with_stack(
        "Api",
        StackScript {
            describe_error: Some(throttled()),
            ..Default::default()
        },
    );
    let templates = MemoryTemplates::default().with("Api", TEMPLATE);
    let deployer = Deployer::new(&api, &templates, CancellationToken::new());

    let err = deployer.deploy(&name("Api")).await.unwrap_err();

    assert!(matches!(err, ProvisionerError::Transport { .. }), "{err:?}");
    assert!(api.creates().is_empty());
    assert!(api.updates().is_empty());
}

#[tokio::test(start_paused = true)]
async fn auth_failure_on_existence_check_is_transport() {
    let api = FakeCloudFormation::new().with_stack(
        "Api",
        StackScript {
            describe_error: Some(ApiError::Auth {
                code: "ExpiredToken".into(),
                message: "The security token included in the request is expired".into(),
            }),
            ..Default::default()
        },
    );
    let templates = MemoryTemplates::default().with("Api", TEMPLATE);
    let deployer = Deployer::new(&api, &templates, CancellationToken::new());

    let err = deployer.deploy(&name("Api")).await.unwrap_err();

    assert!(matches!(err, ProvisionerError::Transport { .. }), "{err:?}");
    assert!(err.to_string().contains("ExpiredToken"));
}

#[tokio::test(start_paused = true)]
async fn rejected_create_is_not_polled() {
    let api = FakeCloudFormation::new().with_stack(
        "Api",
        StackScript {
            submit_error: Some(ApiError::Service {
                code: Some("InsufficientCapabilitiesException".into()),
                message: "Requires capabilities : [CAPABILITY_IAM]".into(),
            }),
            ..Default::default()
        },
    );
    let templates = MemoryTemplates::default().with("Api", TEMPLATE);
    let deployer = Deployer::new(&api, &templates, CancellationToken::new());

    let err = deployer.deploy(&name("Api")).await.unwrap_err();

    match err {
        ProvisionerError::Rejected { message, .. } => {
            assert!(message.contains("CAPABILITY_IAM"))
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert_eq!(api.count("describe:"), 1);
}

#[tokio::test(start_paused = true)]
async fn unchanged_template_still_waits_and_reports() {
    let api = FakeCloudFormation::new().with_stack(
        "Api",
        StackScript {
            exists: true,
            initial_status: StackStatus::UpdateComplete,
            statuses: statuses(&[StackStatus::UpdateComplete]),
            outputs: vec![output("Url", "https://x")],
            no_updates: true,
            ..Default::default()
        },
    );
    let templates = MemoryTemplates::default().with("Api", TEMPLATE);
    let deployer = Deployer::new(&api, &templates, CancellationToken::new());

    let outcome = deployer.deploy(&name("Api")).await.unwrap();

    assert_eq!(outcome.stack_id, stack_id("Api"));
    assert_eq!(outcome.status, StackStatus::UpdateComplete);
    assert_eq!(outcome.outputs.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unchanged_template_on_rolled_back_stack_submits_nothing() {
    let api = FakeCloudFormation::new().with_stack(
        "Api",
        StackScript {
            exists: true,
            initial_status: StackStatus::UpdateRollbackComplete,
            statuses: statuses(&[StackStatus::UpdateRollbackComplete]),
            no_updates: true,
            ..Default::default()
        },
    );
    let templates = MemoryTemplates::default().with("Api", TEMPLATE);
    let deployer = Deployer::new(&api, &templates, CancellationToken::new());

    let err = deployer.deploy(&name("Api")).await.unwrap_err();

    match &err {
        ProvisionerError::Unchanged { stack, status } => {
            assert_eq!(stack, &name("Api"));
            assert_eq!(status, &StackStatus::UpdateRollbackComplete);
        }
        other => panic!("expected Unchanged, got {other:?}"),
    }
    assert!(err.to_string().contains("no update was submitted"));
    assert_eq!(api.count("update:"), 1);
    assert_eq!(api.count("describe:"), 1);
}

#[tokio::test(start_paused = true)]
async fn stack_gone_before_outputs_are_collected() {
    let api = FakeCloudFormation::new().with_stack(
        "Api",
        StackScript {
            statuses: statuses(&[StackStatus::CreateInProgress, StackStatus::CreateComplete]),
            outputs: vec![output("Url", "https://x")],
            vanish_after_polls: Some(2),
            ..Default::default()
        },
    );
    let templates = MemoryTemplates::default().with("Api", TEMPLATE);
    let deployer = Deployer::new(&api, &templates, CancellationToken::new());

    let err = deployer.deploy(&name("Api")).await.unwrap_err();

    match err {
        ProvisionerError::StackNotFound { stack } => assert_eq!(stack, name("Api")),
        other => panic!("expected StackNotFound, got {other:?}"),
    }
    // existence check, two polls, then the outputs read
    assert_eq!(api.count("describe:"), 4);
}

#[tokio::test(start_paused = true)]
async fn missing_template_fails_before_any_call() {
    let api = FakeCloudFormation::new();
    let templates = MemoryTemplates::default();
    let deployer = Deployer::new(&api, &templates, CancellationToken::new());

    let err = deployer.deploy(&name("Ghost")).await.unwrap_err();

    assert!(matches!(err, ProvisionerError::Template { .. }), "{err:?}");
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn every_terminal_failure_status_stops_the_wait() {
    let failures = [
        StackStatus::CreateFailed,
        StackStatus::RollbackComplete,
        StackStatus::RollbackFailed,
        StackStatus::UpdateRollbackComplete,
        StackStatus::UpdateRollbackFailed,
        StackStatus::DeleteComplete,
        StackStatus::DeleteFailed,
    ];

    for status in failures {
        let api = FakeCloudFormation::new().with_stack(
            "Api",
            StackScript {
                statuses: statuses(&[status.clone()]),
                ..Default::default()
            },
        );
        let templates = MemoryTemplates::default().with("Api", TEMPLATE);
        let deployer = Deployer::new(&api, &templates, CancellationToken::new());

        match deployer.deploy(&name("Api")).await {
            Err(ProvisionerError::OperationFailed { status: seen, .. }) => {
                assert_eq!(seen, status)
            }
            other => panic!("{status}: expected OperationFailed, got {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn transitional_and_unknown_statuses_keep_polling() {
    let api = FakeCloudFormation::new().with_stack(
        "Api",
        StackScript {
            statuses: statuses(&[
                StackStatus::ReviewInProgress,
                StackStatus::CreateInProgress,
                StackStatus::from("SOMETHING_NEW_IN_PROGRESS"),
                StackStatus::UpdateCompleteCleanupInProgress,
                StackStatus::UpdateComplete,
            ]),
            ..Default::default()
        },
    );
    let templates = MemoryTemplates::default().with("Api", TEMPLATE);
    let deployer = Deployer::new(&api, &templates, CancellationToken::new());

    let outcome = deployer.deploy(&name("Api")).await.unwrap();

    assert_eq!(outcome.status, StackStatus::UpdateComplete);
    // existence check, five polls, outputs
    assert_eq!(api.count("describe:"), 7);
}

#[tokio::test(start_paused = true)]
async fn wait_times_out_at_the_deadline() {
    let api = FakeCloudFormation::new().with_stack(
        "Slow",
        StackScript {
            statuses: statuses(&[StackStatus::CreateInProgress]),
            ..Default::default()
        },
    );
    let templates = MemoryTemplates::default().with("Slow", TEMPLATE);
    let policy = PollPolicy {
        interval: Duration::from_secs(10),
        timeout: Duration::from_secs(30),
    };
    let deployer = Deployer::new(&api, &templates, CancellationToken::new()).with_policy(policy);

    let err = deployer.deploy(&name("Slow")).await.unwrap_err();

    assert!(err.is_timeout(), "{err:?}");
    // polls at 10s and 20s; at 30s the deadline wins over the tick
    assert_eq!(api.count("describe:"), 3);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_wait() {
    let api = FakeCloudFormation::new().with_stack(
        "Slow",
        StackScript {
            statuses: statuses(&[StackStatus::CreateInProgress]),
            ..Default::default()
        },
    );
    let templates = MemoryTemplates::default().with("Slow", TEMPLATE);
    let cancel = CancellationToken::new();
    let deployer = Deployer::new(&api, &templates, cancel.clone());

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(15)).await;
        trigger.cancel();
    });

    let err = deployer.deploy(&name("Slow")).await.unwrap_err();

    assert!(err.is_cancelled(), "{err:?}");
    assert_eq!(api.count("describe:"), 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_waiting_polls_nothing() {
    let api = FakeCloudFormation::new().with_stack("Api", StackScript::default());
    let templates = MemoryTemplates::default().with("Api", TEMPLATE);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let deployer = Deployer::new(&api, &templates, cancel);

    let err = deployer.deploy(&name("Api")).await.unwrap_err();

    assert!(err.is_cancelled(), "{err:?}");
    assert_eq!(api.count("describe:"), 1);
}

#[tokio::test(start_paused = true)]
async fn query_failure_during_wait_is_returned() {
    let api = FakeCloudFormation::new().with_stack(
        "Api",
        StackScript {
            poll_error: Some(ApiError::Service {
                code: Some("Throttling".into()),
                message: "Rate exceeded".into(),
            }),
            ..Default::default()
        },
    );
    let templates = MemoryTemplates::default().with("Api", TEMPLATE);
    let deployer = Deployer::new(&api, &templates, CancellationToken::new());

    let err = deployer.deploy(&name("Api")).await.unwrap_err();

    match err {
        ProvisionerError::Api { message, .. } => assert_eq!(message, "Rate exceeded"),
        other => panic!("expected Api error, got {other:?}"),
    }
}
