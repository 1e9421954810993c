use super::binding::{Binding, BindingId};
use crate::di::MetadataProvider;
use crate::unify::{unify_fresh, MarkerSet};
use std::collections::HashMap;
use std::sync::Arc;
use stitch_core::{
    Diagnostic, DiagnosticId, DiagnosticSink, Injection, Substitution, Tag, TypeRef,
};
use tracing::debug;

type BindingKey = (TypeRef, Option<Tag>);

/// Mutable registry, filled from the declaration stream before a pass
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: Vec<Binding>,
    keys: HashMap<BindingKey, BindingId>,
    markers: MarkerSet,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_markers(markers: MarkerSet) -> Self {
        Self {
            markers,
            ..Self::default()
        }
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    /// Register a binding and return its id
    ///
    /// A binding whose `(contract, tag)` key was already taken replaces the
    /// earlier entry for that key. This is reported as informational only.
    pub fn register(&mut self, mut binding: Binding, sink: &mut dyn DiagnosticSink) -> BindingId {
        let id = self.bindings.len();
        binding.id = id;

        for contract in &binding.contracts {
            let key = (contract.clone(), binding.tag.clone());
            if let Some(previous) = self.keys.insert(key, id) {
                if previous == id {
                    continue;
                }
                let injection = Injection::new(contract.clone(), binding.tag.clone());
                debug!("binding #{} shadows #{} for {}", id, previous, injection);
                sink.report(
                    Diagnostic::info(
                        DiagnosticId::BindingShadowed,
                        format!(
                            "Binding #{} for {} is shadowed by binding #{}",
                            previous, injection, id
                        ),
                    )
                    .with_location(binding.location.clone())
                    .with_chain(vec![injection]),
                );
            }
        }

        self.bindings.push(binding);
        id
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Freeze the registry into an immutable snapshot for one pass
    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut entries = Vec::new();
        for binding in &self.bindings {
            for contract in &binding.contracts {
                let key = (contract.clone(), binding.tag.clone());
                let live = self.keys.get(&key) == Some(&binding.id);
                let duplicate = entries
                    .iter()
                    .any(|e: &Entry| e.binding == binding.id && &e.contract == contract);
                if live && !duplicate {
                    entries.push(Entry {
                        contract: contract.clone(),
                        tag: binding.tag.clone(),
                        binding: binding.id,
                    });
                }
            }
        }

        RegistrySnapshot {
            inner: Arc::new(SnapshotInner {
                bindings: self.bindings.clone(),
                keys: self.keys.clone(),
                entries,
                markers: self.markers.clone(),
            }),
        }
    }
}

/// A live `(contract, tag) → binding` entry
#[derive(Debug, Clone)]
struct Entry {
    contract: TypeRef,
    tag: Option<Tag>,
    binding: BindingId,
}

#[derive(Debug)]
struct SnapshotInner {
    bindings: Vec<Binding>,
    keys: HashMap<BindingKey, BindingId>,
    /// Live entries in registration order
    entries: Vec<Entry>,
    markers: MarkerSet,
}

/// A binding chosen for a request, with the marker substitution that makes
/// its contract match
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub binding: BindingId,
    /// Contract as declared on the binding (may be open)
    pub pattern: TypeRef,
    /// Tag as declared on the binding
    pub tag: Option<Tag>,
    pub substitution: Substitution,
    /// Another equally specific open-generic binding that also matched
    pub ambiguous_with: Option<BindingId>,
}

impl Candidate {
    fn exact(entry: &Entry) -> Self {
        Self {
            binding: entry.binding,
            pattern: entry.contract.clone(),
            tag: entry.tag.clone(),
            substitution: Substitution::new(),
            ambiguous_with: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Candidate),
    /// An open-generic binding matched structurally but a constraint rejected it
    ConstraintViolation { binding: BindingId, reason: String },
    NotFound,
}

/// Immutable, cheaply clonable view of the registry
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    inner: Arc<SnapshotInner>,
}

impl RegistrySnapshot {
    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.inner.bindings[id]
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.inner.bindings
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.inner.markers
    }

    /// Bindings with an open-generic contract, in registration order
    pub fn all_open_generic_bindings(&self) -> Vec<&Binding> {
        let mut out: Vec<&Binding> = Vec::new();
        for entry in self.inner.entries.iter().filter(|e| e.contract.is_open()) {
            if out.last().map(|b| b.id) != Some(entry.binding) {
                out.push(self.binding(entry.binding));
            }
        }
        out
    }

    /// Find the binding answering `injection`
    ///
    /// Priority: exact type and tag, then exact type with an `Any`-tagged
    /// binding, then open-generic patterns. Among open-generic matches an
    /// exact tag beats `Any`, then the more specific pattern wins, then the
    /// later registration. Equally ranked matches with different patterns
    /// are flagged through [`Candidate::ambiguous_with`].
    pub fn lookup(&self, injection: &Injection, metadata: &dyn MetadataProvider) -> Lookup {
        let contract = &injection.contract;
        let inner = &self.inner;

        if !contract.is_open() {
            for tag in [injection.tag.clone(), Some(Tag::Any)] {
                if let Some(&id) = inner.keys.get(&(contract.clone(), tag.clone())) {
                    return Lookup::Found(Candidate {
                        binding: id,
                        pattern: contract.clone(),
                        tag,
                        substitution: Substitution::new(),
                        ambiguous_with: None,
                    });
                }
            }
        }

        let mut best: Option<(bool, usize, Candidate)> = None;
        let mut violation = None;

        let open_entries = inner
            .entries
            .iter()
            .filter(|e| e.contract.is_open())
            .filter(|e| Tag::matches(e.tag.as_ref(), injection.tag.as_ref()));

        for entry in open_entries {
            let Some(substitution) = unify_fresh(&entry.contract, contract) else {
                continue;
            };
            if let Err(reason) = inner.markers.check(&substitution, metadata) {
                violation.get_or_insert((entry.binding, reason));
                continue;
            }

            let exact_tag = entry.tag != Some(Tag::Any);
            let specificity = entry.contract.specificity();
            let mut candidate = Candidate {
                substitution,
                ..Candidate::exact(entry)
            };

            best = match best {
                None => Some((exact_tag, specificity, candidate)),
                Some((best_tag, best_specificity, previous)) => {
                    if (exact_tag, specificity) < (best_tag, best_specificity) {
                        Some((best_tag, best_specificity, previous))
                    } else {
                        // Equal rank: the later registration wins the tie
                        if (exact_tag, specificity) == (best_tag, best_specificity) {
                            candidate.ambiguous_with = if previous.pattern != candidate.pattern {
                                Some(previous.binding)
                            } else {
                                previous.ambiguous_with
                            };
                        }
                        Some((exact_tag, specificity, candidate))
                    }
                }
            };
        }

        match (best, violation) {
            (Some((_, _, candidate)), _) => Lookup::Found(candidate),
            (None, Some((binding, reason))) => Lookup::ConstraintViolation { binding, reason },
            (None, None) => Lookup::NotFound,
        }
    }

    /// Every live binding whose contract is `element`, across all tags, in
    /// registration order. Used to synthesize collections.
    pub fn bindings_for_element(&self, element: &TypeRef, metadata: &dyn MetadataProvider) -> Vec<Candidate> {
        let inner = &self.inner;
        let mut out: Vec<Candidate> = Vec::new();

        for entry in &inner.entries {
            let candidate = if &entry.contract == element {
                Candidate::exact(entry)
            } else if entry.contract.is_open() {
                let Some(substitution) = unify_fresh(&entry.contract, element) else {
                    continue;
                };
                if inner.markers.check(&substitution, metadata).is_err() {
                    continue;
                }
                Candidate {
                    substitution,
                    ..Candidate::exact(entry)
                }
            } else {
                continue;
            };

            if !out.iter().any(|c| c.binding == candidate.binding) {
                out.push(candidate);
            }
        }
        out
    }
}
