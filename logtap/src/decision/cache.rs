//! [`DecisionCache`]: per-method precomputed interception verdicts.
//!
//! Populated once per candidate method, either during startup precompilation
//! ([`crate::lifecycle::LifecycleController::start`]) or on first touch for a
//! method the host didn't register ahead of time. Reads never block: once a
//! handle is registered, [`DecisionCache::decision_for`] is a single DashMap
//! shard lookup and an `Arc` clone, with no further allocation.
use crate::config::Config;
use crate::decision::service;
use dashmap::DashMap;
use logtap_core::{
    any_pattern_matches, DecisionOverride, InterceptionDecision, MethodDescriptor, MethodHandle,
    TypeRegistry,
};
use std::sync::Arc;

/// The `(declaring_type, method_name, param_type_names)` shape used to match
/// an interface method against a registered concrete implementation.
type Signature = (String, String, Vec<String>);

fn signature_of(descriptor: &MethodDescriptor) -> Signature {
    (
        descriptor.declaring_type.clone(),
        descriptor.method_name.clone(),
        descriptor.param_type_names.clone(),
    )
}

/// The precomputed per-method decision cache.
#[derive(Debug)]
pub struct DecisionCache {
    decisions: DashMap<MethodHandle, Option<Arc<InterceptionDecision>>>,
    by_signature: DashMap<Signature, MethodHandle>,
    config: Arc<Config>,
}

impl DecisionCache {
    pub fn new(config: Arc<Config>) -> Self {
        DecisionCache {
            decisions: DashMap::new(),
            by_signature: DashMap::new(),
            config,
        }
    }

    /// Registers a candidate method, computing its decision once through the
    /// three-tier resolver and the eligibility filter, and returns a stable
    /// handle for hot-path lookup.
    ///
    /// `attribute` is whatever the host's metadata mechanism (derive macro,
    /// build-time scan, explicit registration) discovered as the tier-1
    /// override for this method; pass [`DecisionOverride::None`] if there is
    /// none.
    pub fn register(&self, descriptor: &MethodDescriptor, attribute: DecisionOverride) -> MethodHandle {
        let handle = MethodHandle::next();
        let decision = resolve_decision(descriptor, attribute, &self.config);
        self.decisions.insert(handle, decision.map(Arc::new));
        self.by_signature.insert(signature_of(descriptor), handle);
        handle
    }

    /// Hot-path lookup: `None` means the method must run without logging
    /// overhead.
    pub fn decision_for(&self, handle: MethodHandle) -> Option<Arc<InterceptionDecision>> {
        self.decisions.get(&handle).and_then(|entry| entry.clone())
    }

    /// Resolves an interface method call to its concrete implementation's
    /// cached decision by scanning `type_registry` for a previously
    /// registered implementation whose `(method_name, param_type_names)`
    /// matches. If no implementation is cached, computes the decision
    /// on demand from the interface method's own attribute/config, per the
    /// specification's interface resolution fallback.
    pub fn decision_for_interface(
        &self,
        interface_descriptor: &MethodDescriptor,
        type_registry: &dyn TypeRegistry,
        attribute: DecisionOverride,
    ) -> Option<Arc<InterceptionDecision>> {
        let (method_name, param_types) = interface_descriptor.signature();
        for impl_type in type_registry.implementations_of(&interface_descriptor.declaring_type) {
            let key = (impl_type, method_name.to_string(), param_types.to_vec());
            if let Some(handle) = self.by_signature.get(&key) {
                return self.decision_for(*handle);
            }
        }
        resolve_decision(interface_descriptor, attribute, &self.config).map(Arc::new)
    }
}

/// The three-tier resolver, applied once per method.
///
/// 1. Attribute override on the method/type (highest). `Disabled` vetoes
///    everything; `LogInput`/`LogOutput`/`LogBoth` supply the decision
///    directly.
/// 2. Configuration pattern match (medium), subject to its own exclude-list.
/// 3. Auto-interception default (lowest), only if enabled globally.
///
/// Never panics: every input is already validated data, not something that
/// can fail at the point this runs.
fn resolve_decision(
    descriptor: &MethodDescriptor,
    attribute: DecisionOverride,
    config: &Config,
) -> Option<InterceptionDecision> {
    if !descriptor.is_interceptable_shape {
        return None;
    }

    match attribute {
        DecisionOverride::Disabled => return None,
        DecisionOverride::LogInput { .. } | DecisionOverride::LogOutput { .. } | DecisionOverride::LogBoth { .. } => {
            return attribute.into_decision();
        }
        DecisionOverride::None => {}
    }

    if let Some(matched) = service::select_for_type(&config.services, &descriptor.declaring_type) {
        if any_pattern_matches(matched.exclude_method_patterns, &descriptor.method_name) {
            return None;
        }
        return Some(InterceptionDecision {
            behavior: matched.behavior,
            level: matched.level,
            error_level: matched.error_level,
            target: matched.target.map(str::to_string),
            formatter: matched.formatter.map(str::to_string),
            exclude_method_patterns: matched.exclude_method_patterns.to_vec(),
        });
    }

    if config.auto_intercept {
        return Some(InterceptionDecision::auto_default());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtap_core::Behavior;
    use std::collections::HashMap;

    fn cache_with(map: &[(&str, &str)]) -> DecisionCache {
        let raw: HashMap<String, String> = map.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        DecisionCache::new(Arc::new(Config::from_map(&raw).unwrap()))
    }

    #[test]
    fn attribute_veto_beats_config_and_auto() {
        let cache = cache_with(&[("AutoIntercept", "true")]);
        let descriptor = MethodDescriptor::new("Payments", "Charge", vec![]);
        let handle = cache.register(&descriptor, DecisionOverride::Disabled);
        assert!(cache.decision_for(handle).is_none());
    }

    #[test]
    fn auto_intercept_default_applies_when_nothing_else_matches() {
        let cache = cache_with(&[("AutoIntercept", "true")]);
        let descriptor = MethodDescriptor::new("Payments", "Charge", vec![]);
        let handle = cache.register(&descriptor, DecisionOverride::None);
        let decision = cache.decision_for(handle).unwrap();
        assert_eq!(decision.behavior, Behavior::LogInput);
    }

    #[test]
    fn no_decision_without_auto_intercept_or_match() {
        let cache = cache_with(&[]);
        let descriptor = MethodDescriptor::new("Payments", "Charge", vec![]);
        let handle = cache.register(&descriptor, DecisionOverride::None);
        assert!(cache.decision_for(handle).is_none());
    }

    #[test]
    fn wildcard_excludes_suppress_matching_methods() {
        let cache = cache_with(&[
            ("Services.App.Hot.*.Level", "Warning"),
            ("Services.App.Hot.*.ExcludeMethodPatterns", "Get*,*Cache*"),
        ]);
        let get = MethodDescriptor::new("App.Hot.Reader", "GetUser", vec![]);
        let recompute = MethodDescriptor::new("App.Hot.Reader", "Recompute", vec![]);
        let get_handle = cache.register(&get, DecisionOverride::None);
        let recompute_handle = cache.register(&recompute, DecisionOverride::None);
        assert!(cache.decision_for(get_handle).is_none());
        let decision = cache.decision_for(recompute_handle).unwrap();
        assert_eq!(decision.level, logtap_core::Level::Warning);
    }

    #[test]
    fn ineligible_shape_is_never_intercepted() {
        let cache = cache_with(&[("AutoIntercept", "true")]);
        let descriptor = MethodDescriptor::new("Payments", "ToString", vec![]).not_interceptable_shape();
        let handle = cache.register(&descriptor, DecisionOverride::None);
        assert!(cache.decision_for(handle).is_none());
    }

    struct FakeRegistry;
    impl TypeRegistry for FakeRegistry {
        fn implementations_of(&self, interface_type: &str) -> Vec<String> {
            if interface_type == "IPayments" {
                vec!["Payments".to_string()]
            } else {
                vec![]
            }
        }
    }

    #[test]
    fn interface_call_resolves_to_registered_implementation_decision() {
        let cache = cache_with(&[]);
        let impl_descriptor = MethodDescriptor::new("Payments", "Charge", vec!["i64".to_string()]);
        cache.register(
            &impl_descriptor,
            DecisionOverride::LogBoth {
                level: None,
                error_level: None,
                target: None,
                formatter: None,
            },
        );

        let iface_descriptor =
            MethodDescriptor::new("IPayments", "Charge", vec!["i64".to_string()]).interface();
        let decision = cache
            .decision_for_interface(&iface_descriptor, &FakeRegistry, DecisionOverride::None)
            .unwrap();
        assert_eq!(decision.behavior, Behavior::LogBoth);
    }

    #[test]
    fn interface_call_falls_back_to_on_demand_when_uncached() {
        let cache = cache_with(&[("AutoIntercept", "true")]);
        let iface_descriptor = MethodDescriptor::new("IOther", "Do", vec![]).interface();
        let decision = cache
            .decision_for_interface(&iface_descriptor, &FakeRegistry, DecisionOverride::None)
            .unwrap();
        assert_eq!(decision.behavior, Behavior::LogInput);
    }
}
