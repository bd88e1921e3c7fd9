//! Fault aggregation for fallible extension points.

use std::panic::{self, AssertUnwindSafe};

use crate::fault::Fault;

/// Run `f`, turning both an `Err` and a panic into a [`Fault`].
///
/// This is the single place where extension-point panics are caught. The default panic hook still runs,
/// so the panic message is printed to stderr as it would be under `cargo test`.
pub fn capture<T>(f: impl FnOnce() -> Result<T, Fault>) -> Result<T, Fault> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Fault::from_panic(payload)),
    }
}

/// Ordered list of faults captured at one level of the run.
///
/// Branching copies the faults recorded so far. A branch and its parent are fully independent
/// afterwards: clearing or adding to one never shows up in the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultCollector {
    faults: Vec<Fault>,
}

impl FaultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a child collector that starts with a copy of this collector's faults.
    pub fn branch(&self) -> Self {
        Self {
            faults: self.faults.clone(),
        }
    }

    pub fn add(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    /// Append every fault of `other`.
    pub fn aggregate(&mut self, other: &FaultCollector) {
        self.faults.extend(other.faults.iter().cloned());
    }

    pub fn has_faults(&self) -> bool {
        !self.faults.is_empty()
    }

    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    pub fn clear(&mut self) {
        self.faults.clear();
    }

    /// Collapse to a single fault: none, the only fault, or an aggregate of all of them.
    pub fn to_fault(&self) -> Option<Fault> {
        match self.faults.as_slice() {
            [] => None,
            [only] => Some(only.clone()),
            many => Some(Fault::aggregate(many.to_vec())),
        }
    }

    /// Run `f`, recording its fault (or panic) instead of returning it.
    pub fn run<T>(&mut self, f: impl FnOnce() -> Result<T, Fault>) -> Option<T> {
        match capture(f) {
            Ok(value) => Some(value),
            Err(fault) => {
                self.add(fault);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::{AGGREGATE, PANIC};

    #[test]
    fn test_empty_collector_has_no_fault() {
        let collector = FaultCollector::new();
        assert!(!collector.has_faults());
        assert_eq!(collector.to_fault(), None);
    }

    #[test]
    fn test_single_fault_is_returned_as_is() {
        let mut collector = FaultCollector::new();
        collector.add(Fault::new("t", "m"));
        assert_eq!(collector.to_fault(), Some(Fault::new("t", "m")));
    }

    #[test]
    fn test_many_faults_collapse_into_aggregate() {
        let mut collector = FaultCollector::new();
        collector.add(Fault::new("a", "1"));
        collector.add(Fault::new("b", "2"));

        let fault = collector.to_fault().unwrap();
        assert_eq!(fault.type_name, AGGREGATE);
        assert_eq!(fault.inner, vec![Fault::new("a", "1"), Fault::new("b", "2")]);
    }

    #[test]
    fn test_branch_copies_then_diverges() {
        let mut parent = FaultCollector::new();
        parent.add(Fault::new("parent", "recorded before branching"));

        let mut child = parent.branch();
        assert!(child.has_faults());

        child.clear();
        assert!(parent.has_faults(), "clearing the child must not touch the parent");

        child.add(Fault::new("child", "only here"));
        parent.add(Fault::new("parent", "after branching"));
        assert_eq!(child.faults().len(), 1);
        assert_eq!(parent.faults().len(), 2);
    }

    #[test]
    fn test_sibling_branches_are_isolated() {
        let parent = FaultCollector::new();
        let mut first = parent.branch();
        let second = parent.branch();

        first.add(Fault::new("t", "first sibling"));
        assert!(!second.has_faults());
        assert!(!parent.has_faults());
    }

    #[test]
    fn test_run_records_err() {
        let mut collector = FaultCollector::new();
        let value: Option<()> = collector.run(|| Err(Fault::new("t", "hook failed")));
        assert!(value.is_none());
        assert_eq!(collector.faults()[0].message, "hook failed");
    }

    #[test]
    fn test_run_records_panic() {
        let mut collector = FaultCollector::new();
        let value: Option<u32> = collector.run(|| panic!("hook exploded"));
        assert!(value.is_none());
        assert_eq!(collector.faults()[0].type_name, PANIC);
        assert_eq!(collector.faults()[0].message, "hook exploded");
    }

    #[test]
    fn test_run_passes_value_through() {
        let mut collector = FaultCollector::new();
        assert_eq!(collector.run(|| Ok(7)), Some(7));
        assert!(!collector.has_faults());
    }

    #[test]
    fn test_aggregate_appends() {
        let mut a = FaultCollector::new();
        a.add(Fault::new("a", "1"));
        let mut b = FaultCollector::new();
        b.add(Fault::new("b", "2"));

        a.aggregate(&b);
        assert_eq!(a.faults().len(), 2);
        assert_eq!(b.faults().len(), 1);
    }
}
