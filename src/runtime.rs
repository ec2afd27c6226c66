//! Host runtime extension points and the invocation dispatcher.
//!
//! The runtime exposes four typed hooks; namespace isolation is one ordinary
//! [`RuntimeHooks`] implementation registered against them:
//!
//! 1. `before_binding`: every binding the runtime constructs.
//! 2. `after_layout`: each page layout, once, before it is served.
//! 3. `before_dispatch`: the trigger context, before the callback body runs.
//! 4. `after_response`: the outgoing payload, before transport.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info_span};

use crate::codec::IdentifierCodec;
use crate::component::ComponentRef;
use crate::dependency::{Dependency, DependencyRegistrar};
use crate::error::{NamespaceError, Result};
use crate::identifier::Identifier;
use crate::layout::LayoutNamespacer;
use crate::namespace::Namespace;
use crate::props::PropSetter;
use crate::response::ResponseRewriter;
use crate::trigger::{TriggerContext, TriggerTranslator, TriggeredInput};

// ═══════════════════════════════════════════════════════════════════════════════
// HOOKS
// ═══════════════════════════════════════════════════════════════════════════════

pub trait RuntimeHooks: Send + Sync {
    fn before_binding(&self, _namespace: Option<&Namespace>, dependency: Dependency) -> Result<Dependency> {
        Ok(dependency)
    }

    fn after_layout(&self, _namespace: &Namespace, _layout: &ComponentRef) -> Result<()> {
        Ok(())
    }

    fn before_dispatch(&self, ctx: TriggerContext) -> Result<TriggerContext> {
        Ok(ctx)
    }

    fn after_response(&self, _payload: &mut Value) -> Result<()> {
        Ok(())
    }
}

/// Namespace isolation wired into the runtime hooks.
#[derive(Debug, Clone)]
pub struct NamespaceHooks {
    pub registrar: DependencyRegistrar,
    pub layout: LayoutNamespacer,
    pub trigger: TriggerTranslator,
    pub response: ResponseRewriter,
}

impl RuntimeHooks for NamespaceHooks {
    fn before_binding(&self, namespace: Option<&Namespace>, dependency: Dependency) -> Result<Dependency> {
        self.registrar.intercept(namespace, dependency)
    }

    fn after_layout(&self, namespace: &Namespace, layout: &ComponentRef) -> Result<()> {
        let report = self.layout.namespace_layout(layout, namespace)?;
        debug!(
            namespace = %namespace,
            visited = report.visited,
            rewritten = report.rewritten,
            skipped = report.skipped,
            "namespaced layout"
        );
        Ok(())
    }

    fn before_dispatch(&self, ctx: TriggerContext) -> Result<TriggerContext> {
        self.trigger.translate(ctx)
    }

    fn after_response(&self, payload: &mut Value) -> Result<()> {
        let report = self.response.rewrite(payload)?;
        debug!(entries = report.entries, rewritten = report.rewritten, skipped = report.skipped, "rewrote response");
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CALLBACKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure reported by a callback body.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl From<NamespaceError> for CallbackError {
    fn from(err: NamespaceError) -> Self {
        CallbackError(err.to_string())
    }
}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        CallbackError(message.to_string())
    }
}

/// What a callback body sees: local trigger ids and an out-of-band setter.
pub struct CallbackContext<'a> {
    pub trigger: TriggerContext,
    props: &'a PropSetter,
}

impl CallbackContext<'_> {
    pub fn triggered_id(&self) -> Option<Identifier> {
        self.trigger.triggered_id()
    }

    pub fn triggered_prop_ids(&self) -> Vec<&str> {
        self.trigger.triggered_prop_ids()
    }

    pub fn set_props(&self, id: impl Into<Identifier>, props: Map<String, Value>) -> Result<()> {
        self.props.set_props(id, props)
    }
}

pub type Handler = Arc<
    dyn Fn(&CallbackContext<'_>, &[Value]) -> std::result::Result<Vec<Value>, CallbackError>
        + Send
        + Sync,
>;

#[derive(Clone)]
pub struct CallbackSpec {
    pub namespace: Option<Namespace>,
    pub outputs: Vec<Dependency>,
    pub inputs: Vec<Dependency>,
    pub states: Vec<Dependency>,
    pub handler: Handler,
}

impl CallbackSpec {
    /// Key the runtime addresses this callback by: the output prop ids, with
    /// several outputs joined as `..a.prop...b.prop..`.
    pub fn output_key(&self) -> String {
        output_key(&self.outputs)
    }
}

pub fn output_key(outputs: &[Dependency]) -> String {
    let prop_ids: Vec<String> = outputs.iter().map(Dependency::prop_id).collect();
    if prop_ids.len() == 1 {
        prop_ids.join("")
    } else {
        format!("..{}..", prop_ids.join("..."))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISPATCH
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationValue {
    pub id: Identifier,
    pub property: String,
    #[serde(default)]
    pub value: Value,
}

impl InvocationValue {
    pub fn prop_id(&self) -> String {
        format!("{}.{}", self.id.to_wire(), self.property)
    }
}

/// One inbound request, in the runtime's global terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    pub output: String,
    #[serde(default)]
    pub inputs: Vec<InvocationValue>,
    #[serde(default)]
    pub state: Vec<InvocationValue>,
    #[serde(default)]
    pub changed_prop_ids: Vec<String>,
}

#[derive(Default, Clone)]
pub struct Dispatcher {
    codec: Arc<IdentifierCodec>,
    hooks: Vec<Arc<dyn RuntimeHooks>>,
    callbacks: HashMap<String, CallbackSpec>,
}

impl Dispatcher {
    pub fn new(codec: Arc<IdentifierCodec>) -> Self {
        Self {
            codec,
            hooks: Vec::new(),
            callbacks: HashMap::new(),
        }
    }

    pub fn add_hooks(&mut self, hooks: Arc<dyn RuntimeHooks>) {
        self.hooks.push(hooks);
    }

    pub fn hooks(&self) -> &[Arc<dyn RuntimeHooks>] {
        &self.hooks
    }

    /// Constructs a binding through every `before_binding` hook.
    pub fn bind(&self, namespace: Option<&Namespace>, dependency: Dependency) -> Result<Dependency> {
        self.hooks
            .iter()
            .try_fold(dependency, |dep, hooks| hooks.before_binding(namespace, dep))
    }

    pub fn register(&mut self, spec: CallbackSpec) -> Result<String> {
        let key = spec.output_key();
        if self.callbacks.contains_key(&key) {
            return Err(NamespaceError::DuplicateCallback(key));
        }
        debug!(output = %key, inputs = spec.inputs.len(), "registered callback");
        self.callbacks.insert(key.clone(), spec);
        Ok(key)
    }

    pub fn callback_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.callbacks.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    fn trigger_context(&self, invocation: &Invocation) -> TriggerContext {
        if invocation.changed_prop_ids.is_empty() {
            return TriggerContext::initial();
        }
        let triggered = invocation
            .changed_prop_ids
            .iter()
            .map(|prop_id| {
                let value = invocation
                    .inputs
                    .iter()
                    .find(|input| &input.prop_id() == prop_id)
                    .map_or(Value::Null, |input| input.value.clone());
                TriggeredInput::new(prop_id.clone(), value)
            })
            .collect();
        TriggerContext::new(triggered)
    }

    /// Runs the callback addressed by `invocation.output` and returns the
    /// outgoing payload. Safe to call concurrently.
    pub fn dispatch(&self, invocation: &Invocation) -> Result<Value> {
        let _span = info_span!("dispatch", output = %invocation.output).entered();
        let spec = self
            .callbacks
            .get(&invocation.output)
            .ok_or_else(|| NamespaceError::UnknownCallback(invocation.output.clone()))?;

        let ctx = self
            .hooks
            .iter()
            .try_fold(self.trigger_context(invocation), |ctx, hooks| {
                hooks.before_dispatch(ctx)
            })?;

        let setter = PropSetter::new(Arc::clone(&self.codec), spec.namespace.clone());
        // One argument per declared state; the runtime omits unset ones.
        let state = (0..spec.states.len()).map(|i| {
            invocation
                .state
                .get(i)
                .map_or(Value::Null, |value| value.value.clone())
        });
        let args: Vec<Value> = invocation
            .inputs
            .iter()
            .map(|value| value.value.clone())
            .chain(state)
            .collect();

        let callback_ctx = CallbackContext {
            trigger: ctx,
            props: &setter,
        };
        let callback_error = |message: String| NamespaceError::Callback {
            output: invocation.output.clone(),
            message,
        };
        let values = (spec.handler)(&callback_ctx, &args).map_err(|e| callback_error(e.0))?;
        if values.len() != spec.outputs.len() {
            return Err(callback_error(format!(
                "returned {} values for {} outputs",
                values.len(),
                spec.outputs.len()
            )));
        }

        let mut response = Map::new();
        for (output, value) in spec.outputs.iter().zip(values) {
            let entry = response
                .entry(output.id.to_wire())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(props) = entry {
                props.insert(output.property.clone(), value);
            }
        }

        let mut payload = json!({ "multi": true, "response": response });
        if let Some(side_update) = setter.into_side_update() {
            payload["sideUpdate"] = side_update;
        }

        for hooks in &self.hooks {
            hooks.after_response(&mut payload)?;
        }
        Ok(payload)
    }
}
