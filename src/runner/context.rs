//! Shared state handed to every level of one run.

use std::sync::Arc;

use harrow_core::{CancellationSignal, Message, MessageBus, NullBus, StopOnFailBus};

use crate::config::{CaseOrder, ConstructorPolicy, RunnerConfig};
use crate::extension::{
    AlphabeticalOrder, CaseOrderer, ConstructorArgumentResolver, ConstructorSelector, DiscoveryOrder,
    FixtureResolver, ParameterlessConstructor, SoleConstructor,
};

/// The collaborators and the cancellation flag of a run.
///
/// Cloning is cheap: every field is shared.
#[derive(Clone)]
pub struct RunContext {
    bus: Arc<dyn MessageBus>,
    diagnostics: Arc<dyn MessageBus>,
    cancellation: CancellationSignal,
    orderer: Arc<dyn CaseOrderer>,
    resolver: Arc<dyn ConstructorArgumentResolver>,
    selector: Arc<dyn ConstructorSelector>,
}

impl RunContext {
    /// A context with the default collaborators: discovery order, fixture injection, parameterless
    /// constructors, and diagnostics dropped.
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self {
            bus,
            diagnostics: Arc::new(NullBus),
            cancellation: CancellationSignal::new(),
            orderer: Arc::new(DiscoveryOrder),
            resolver: Arc::new(FixtureResolver),
            selector: Arc::new(ParameterlessConstructor),
        }
    }

    /// A context configured from `config`. With `stop_on_fail` the bus is wrapped in a [`StopOnFailBus`].
    pub fn from_config(bus: Arc<dyn MessageBus>, config: &RunnerConfig) -> Self {
        let bus: Arc<dyn MessageBus> = if config.stop_on_fail {
            Arc::new(StopOnFailBus::new(bus))
        } else {
            bus
        };
        let orderer: Arc<dyn CaseOrderer> = match config.case_order {
            CaseOrder::Discovery => Arc::new(DiscoveryOrder),
            CaseOrder::Alphabetical => Arc::new(AlphabeticalOrder),
        };
        let selector: Arc<dyn ConstructorSelector> = match config.constructor_policy {
            ConstructorPolicy::Parameterless => Arc::new(ParameterlessConstructor),
            ConstructorPolicy::Sole => Arc::new(SoleConstructor),
        };
        Self::new(bus).with_orderer(orderer).with_selector(selector)
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn MessageBus>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationSignal) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_orderer(mut self, orderer: Arc<dyn CaseOrderer>) -> Self {
        self.orderer = orderer;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ConstructorArgumentResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_selector(mut self, selector: Arc<dyn ConstructorSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn orderer(&self) -> &Arc<dyn CaseOrderer> {
        &self.orderer
    }

    pub fn resolver(&self) -> &dyn ConstructorArgumentResolver {
        self.resolver.as_ref()
    }

    pub fn selector(&self) -> &dyn ConstructorSelector {
        self.selector.as_ref()
    }

    /// Queue `message` on the execution bus. A rejection trips cancellation.
    pub(crate) fn send(&self, message: Message) -> bool {
        let name = message.name();
        let accepted = self.bus.queue_message(message);
        if !accepted && self.cancellation.cancel() {
            tracing::debug!(message = name, "message bus rejected a message; cancelling the run");
        }
        accepted
    }

    /// Queue a notice on the diagnostic sink. Its answer is ignored.
    pub(crate) fn diagnostic(&self, text: String) {
        tracing::warn!("{}", text);
        self.diagnostics.queue_message(Message::diagnostic(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harrow_core::{CollectingBus, Fault, UnitKind, UnitRef};
    use std::time::Duration;

    fn unit() -> UnitRef {
        UnitRef::new(UnitKind::Test, "t", "t")
    }

    #[test]
    fn test_rejection_trips_cancellation() {
        let ctx = RunContext::new(Arc::new(CollectingBus::rejecting(|_| true)));
        assert!(!ctx.send(Message::starting(unit())));
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_accepted_message_leaves_run_live() {
        let ctx = RunContext::new(Arc::new(CollectingBus::new()));
        assert!(ctx.send(Message::starting(unit())));
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_diagnostics_go_to_their_own_sink() {
        let bus = Arc::new(CollectingBus::new());
        let diagnostics = Arc::new(CollectingBus::new());
        let ctx = RunContext::new(bus.clone()).with_diagnostics(diagnostics.clone());

        ctx.diagnostic("orderer fell back".to_string());
        assert!(bus.is_empty());
        assert_eq!(diagnostics.messages(), vec![Message::diagnostic("orderer fell back")]);
    }

    #[test]
    fn test_stop_on_fail_config_wraps_bus() {
        let bus = Arc::new(CollectingBus::new());
        let ctx = RunContext::from_config(bus.clone(), &RunnerConfig::new().with_stop_on_fail(true));

        ctx.send(Message::failed(unit(), Duration::ZERO, String::new(), &Fault::new("t", "m")));
        assert!(ctx.is_cancelled());
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn test_config_selects_orderer() {
        let config = RunnerConfig::new().with_case_order(CaseOrder::Alphabetical);
        let ctx = RunContext::from_config(Arc::new(NullBus), &config);
        assert_eq!(ctx.orderer().name(), "alphabetical");
    }
}
