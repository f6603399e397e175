//! Rendering of deploy and drift results, for people or as JSON.

use std::io::{self, Write};

use serde::Serialize;
use stratus_core::{DeployOutcome, DriftOutcome, StackName};

pub fn write_deploy(out: &mut impl Write, outcomes: &[DeployOutcome]) -> io::Result<()> {
    for outcome in outcomes {
        writeln!(out, "Stack: {}", outcome.stack)?;
        writeln!(out, "  Status: {}", outcome.status)?;
        writeln!(out, "  Stack ID: {}", outcome.stack_id)?;
        if outcome.outputs.is_empty() {
            writeln!(out, "  Outputs: none")?;
        } else {
            writeln!(out, "  Outputs:")?;
            for output in &outcome.outputs {
                writeln!(out, "    {} = {}", output.key, output.value)?;
            }
        }
    }
    Ok(())
}

pub fn write_drift(out: &mut impl Write, outcomes: &[DriftOutcome]) -> io::Result<()> {
    for outcome in outcomes {
        writeln!(out, "Stack: {}", outcome.stack)?;
        writeln!(out, "  Drift status: {}", outcome.drift_status)?;
        if outcome.drifted_resources.is_empty() {
            writeln!(out, "  No drifted resources")?;
            continue;
        }
        writeln!(out, "  Drifted resources:")?;
        for resource in &outcome.drifted_resources {
            writeln!(
                out,
                "    {} ({}) {}",
                resource.logical_id, resource.resource_type, resource.drift_status
            )?;
            if !resource.physical_id.is_empty() {
                writeln!(out, "      Physical ID: {}", resource.physical_id)?;
            }
            for diff in &resource.property_diffs {
                writeln!(
                    out,
                    "      {}: expected {}, actual {} ({})",
                    diff.property_path, diff.expected_value, diff.actual_value, diff.difference_type
                )?;
            }
        }
    }
    Ok(())
}

/// JSON document for a batch, complete or cut short.
#[derive(Serialize)]
pub struct BatchReport<'a, T> {
    pub results: &'a [T],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stack: Option<&'a StackName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "no_stacks")]
    pub skipped: &'a [StackName],
}

impl<'a, T> BatchReport<'a, T> {
    pub fn complete(results: &'a [T]) -> Self {
        Self {
            results,
            failed_stack: None,
            error: None,
            skipped: &[],
        }
    }
}

fn no_stacks(stacks: &&[StackName]) -> bool {
    stacks.is_empty()
}

pub fn write_json<T: Serialize>(out: &mut impl Write, report: &BatchReport<'_, T>) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)
}
