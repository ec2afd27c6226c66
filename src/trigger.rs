use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

use crate::codec::{IdentifierCodec, NO_TRIGGER_PROP_ID};
use crate::error::Result;
use crate::identifier::Identifier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredInput {
    pub prop_id: String,
    pub value: Value,
}

impl TriggeredInput {
    pub fn new(prop_id: impl Into<String>, value: Value) -> Self {
        Self {
            prop_id: prop_id.into(),
            value,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.prop_id == NO_TRIGGER_PROP_ID
    }
}

/// Which bound properties changed for the current invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerContext {
    pub triggered_inputs: Vec<TriggeredInput>,
}

impl TriggerContext {
    pub fn new(triggered_inputs: Vec<TriggeredInput>) -> Self {
        Self { triggered_inputs }
    }

    /// Context of the initial load: nothing fired yet.
    pub fn initial() -> Self {
        Self::new(vec![TriggeredInput::new(NO_TRIGGER_PROP_ID, Value::Null)])
    }

    pub fn is_initial(&self) -> bool {
        self.triggered_inputs.iter().all(TriggeredInput::is_sentinel)
    }

    pub fn triggered_prop_ids(&self) -> Vec<&str> {
        self.triggered_inputs
            .iter()
            .filter(|input| !input.is_sentinel())
            .map(|input| input.prop_id.as_str())
            .collect()
    }

    /// Identifier of the first binding that fired.
    pub fn triggered_id(&self) -> Option<Identifier> {
        let prop_id = self.triggered_prop_ids().into_iter().next()?;
        let (id_text, _) = prop_id.rsplit_once('.')?;
        Identifier::from_wire(id_text).ok()
    }

    pub fn value_of(&self, prop_id: &str) -> Option<&Value> {
        self.triggered_inputs
            .iter()
            .find(|input| input.prop_id == prop_id)
            .map(|input| &input.value)
    }
}

/// Turns the runtime's global trigger context into local terms before the
/// callback body sees it.
#[derive(Debug, Clone)]
pub struct TriggerTranslator {
    codec: Arc<IdentifierCodec>,
}

impl TriggerTranslator {
    pub fn new(codec: Arc<IdentifierCodec>) -> Self {
        Self { codec }
    }

    pub fn translate(&self, ctx: TriggerContext) -> Result<TriggerContext> {
        let triggered_inputs = ctx
            .triggered_inputs
            .into_iter()
            .map(|input| {
                if input.is_sentinel() {
                    return Ok(input);
                }
                let prop_id = self.codec.decode_prop_id(&input.prop_id)?;
                trace!(from = %input.prop_id, to = %prop_id, "decoded trigger");
                Ok(TriggeredInput::new(prop_id, input.value))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TriggerContext { triggered_inputs })
    }
}
