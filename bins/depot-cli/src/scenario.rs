//! Scenario files: a JSON list of calls replayed against a chain.
//!
//! Each step names a `caller` and a `call` (tagged by `op`). A step may
//! `bind` the address its call returns to a name; later steps refer to it
//! as `"$name"` wherever an address is expected. A batch creation binds
//! `name.0`, `name.1` and so on.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use depot_core::Address;
use depot_custody::{Call, Chain, ErrorKind, Outcome, Receipt};

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub caller: String,
    pub call: Value,
    #[serde(default)]
    pub bind: Option<String>,
}

/// Parse a scenario file's contents.
pub fn parse(json: &str) -> Result<Vec<Step>> {
    serde_json::from_str(json).context("scenario must be a JSON list of {caller, call} steps")
}

/// Names bound by earlier steps.
#[derive(Default, Debug)]
pub struct Bindings {
    names: BTreeMap<String, Address>,
}

impl Bindings {
    /// Resolve `$name` or parse a literal address.
    pub fn address(&self, token: &str) -> Result<Address> {
        match token.strip_prefix('$') {
            Some(name) => self
                .names
                .get(name)
                .copied()
                .ok_or_else(|| anyhow!("unbound name `${name}`")),
            None => token
                .parse()
                .with_context(|| format!("invalid address `{token}`")),
        }
    }

    fn substitute(&self, value: &mut Value) -> Result<()> {
        match value {
            Value::String(s) if s.starts_with('$') => *s = self.address(s)?.to_string(),
            Value::Array(items) => {
                for item in items {
                    self.substitute(item)?;
                }
            }
            Value::Object(fields) => {
                for field in fields.values_mut() {
                    self.substitute(field)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn bind(&mut self, name: &str, outcome: &Outcome) -> Result<()> {
        match outcome {
            Outcome::Address(address) => {
                self.names.insert(name.to_string(), *address);
            }
            Outcome::Addresses(addresses) => {
                for (i, address) in addresses.iter().enumerate() {
                    self.names.insert(format!("{name}.{i}"), *address);
                }
            }
            _ => bail!("cannot bind `{name}`: the call returned no address"),
        }
        Ok(())
    }
}

/// What happened to one step.
#[derive(Serialize, Debug)]
pub struct StepReport {
    pub step: usize,
    pub op: &'static str,
    pub caller: Address,
    #[serde(flatten)]
    pub result: StepResult,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "snake_case")]
pub enum StepResult {
    Ok(Receipt),
    Reverted { kind: ErrorKind, reason: String },
}

impl StepReport {
    pub fn is_reverted(&self) -> bool {
        matches!(self.result, StepResult::Reverted { .. })
    }
}

/// Replay `steps` against `chain`.
///
/// A reverted call is reported and replay continues unless `fail_fast` is
/// set. A malformed step, or a bind on a reverted call, aborts replay.
pub fn run(chain: &mut Chain, steps: &[Step], fail_fast: bool) -> Result<Vec<StepReport>> {
    let mut bindings = Bindings::default();
    let mut reports = Vec::with_capacity(steps.len());

    for (i, step) in steps.iter().enumerate() {
        let caller = bindings
            .address(&step.caller)
            .with_context(|| format!("step {i}: caller"))?;
        let mut raw = step.call.clone();
        bindings
            .substitute(&mut raw)
            .with_context(|| format!("step {i}: call"))?;
        let call: Call =
            serde_json::from_value(raw).with_context(|| format!("step {i}: malformed call"))?;

        let result = match chain.execute(&caller, &call) {
            Ok(receipt) => {
                if let Some(name) = &step.bind {
                    bindings
                        .bind(name, &receipt.outcome)
                        .with_context(|| format!("step {i}"))?;
                }
                StepResult::Ok(receipt)
            }
            Err(e) => {
                if let Some(name) = &step.bind {
                    bail!("step {i}: `{}` reverted before binding `{name}`: {e}", call.name());
                }
                StepResult::Reverted {
                    kind: e.kind(),
                    reason: e.reason(),
                }
            }
        };

        let report = StepReport {
            step: i,
            op: call.name(),
            caller,
            result,
        };
        let stop = fail_fast && report.is_reverted();
        reports.push(report);
        if stop {
            break;
        }
    }
    Ok(reports)
}
