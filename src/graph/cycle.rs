use super::model::NodeId;
use stitch_core::Injection;

/// A resolution in progress
#[derive(Debug, Clone)]
struct Frame {
    injection: Injection,
    node: NodeId,
    /// Entered as the value of a deferred wrapper
    via_deferred: bool,
    /// Singleton/Scoped node, built in a context of its own
    persistent: bool,
}

/// Outcome of meeting an injection that is already being resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repeat {
    /// The loop passes through a deferred wrapper; refer back to `node`
    Accepted { node: NodeId },
    /// No deferred edge on the loop; the chain runs from the first
    /// occurrence to the repeated request
    Rejected { chain: Vec<Injection> },
}

/// In-progress stack keyed by `(contract, tag)`
#[derive(Debug, Default)]
pub struct ResolutionStack {
    frames: Vec<Frame>,
}

impl ResolutionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, injection: Injection, node: NodeId, via_deferred: bool, persistent: bool) {
        self.frames.push(Frame {
            injection,
            node,
            via_deferred,
            persistent,
        });
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Check whether requesting `injection` closes a loop
    ///
    /// A deferred loop back to a local node outside the innermost persistent
    /// frame is not a repeat. The persistent instance is shared by every
    /// root, so it gets its own copy of that node instead.
    pub fn check(&self, injection: &Injection, via_deferred: bool) -> Option<Repeat> {
        let start = self.frames.iter().rposition(|f| &f.injection == injection)?;
        let loop_frames = &self.frames[start + 1..];

        if via_deferred || loop_frames.iter().any(|f| f.via_deferred) {
            if !self.frames[start].persistent && loop_frames.iter().any(|f| f.persistent) {
                return None;
            }
            return Some(Repeat::Accepted {
                node: self.frames[start].node,
            });
        }

        let mut chain: Vec<Injection> = self.frames[start..]
            .iter()
            .map(|f| f.injection.clone())
            .collect();
        chain.push(injection.clone());
        Some(Repeat::Rejected { chain })
    }

    /// Requests from the root down to the current one, followed by `last`
    pub fn chain(&self, last: &Injection) -> Vec<Injection> {
        let mut chain: Vec<Injection> = self.frames.iter().map(|f| f.injection.clone()).collect();
        if chain.last() != Some(last) {
            chain.push(last.clone());
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_core::TypeRef;

    fn inj(name: &str) -> Injection {
        Injection::untagged(TypeRef::named(name))
    }

    #[test]
    fn test_no_repeat() {
        let mut stack = ResolutionStack::new();
        stack.push(inj("A"), 0, false, false);
        assert_eq!(stack.check(&inj("B"), false), None);
    }

    #[test]
    fn test_eager_loop_is_rejected_with_chain() {
        let mut stack = ResolutionStack::new();
        stack.push(inj("Root"), 0, false, false);
        stack.push(inj("A"), 1, false, false);
        stack.push(inj("B"), 2, false, false);

        match stack.check(&inj("A"), false) {
            Some(Repeat::Rejected { chain }) => {
                let names: Vec<_> = chain.iter().map(ToString::to_string).collect();
                assert_eq!(names, vec!["A", "B", "A"]);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_loop_through_deferred_is_accepted() {
        let mut stack = ResolutionStack::new();
        stack.push(inj("Tool"), 0, false, false);
        stack.push(inj("Lazy<View>"), 1, false, false);
        stack.push(inj("View"), 2, true, false);
        stack.push(inj("Model"), 3, false, false);

        assert_eq!(stack.check(&inj("Tool"), false), Some(Repeat::Accepted { node: 0 }));
        // A deferred frame before the first occurrence does not count
        assert!(matches!(
            stack.check(&inj("Model"), false),
            Some(Repeat::Rejected { .. })
        ));
    }

    #[test]
    fn test_deferred_request_closes_loop() {
        let mut stack = ResolutionStack::new();
        stack.push(inj("A"), 0, false, false);
        assert_eq!(stack.check(&inj("A"), true), Some(Repeat::Accepted { node: 0 }));
    }

    #[test]
    fn test_deferred_loop_out_of_persistent_frame_is_rebuilt() {
        let mut stack = ResolutionStack::new();
        stack.push(inj("IA"), 0, false, false);
        stack.push(inj("IS"), 1, false, true);
        stack.push(inj("Lazy<IA>"), 2, false, false);

        // IA sits below the singleton and belongs to the first root only
        assert_eq!(stack.check(&inj("IA"), true), None);

        stack.push(inj("IA"), 3, true, false);
        assert_eq!(stack.check(&inj("IA"), false), Some(Repeat::Accepted { node: 3 }));
        assert_eq!(stack.check(&inj("IS"), false), Some(Repeat::Accepted { node: 1 }));
    }

    #[test]
    fn test_eager_loop_through_persistent_frame_is_rejected() {
        let mut stack = ResolutionStack::new();
        stack.push(inj("IA"), 0, false, false);
        stack.push(inj("IS"), 1, false, true);

        assert!(matches!(
            stack.check(&inj("IA"), false),
            Some(Repeat::Rejected { .. })
        ));
    }
}
