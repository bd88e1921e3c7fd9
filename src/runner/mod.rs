//! The runner stack: assembly → collection → class → method → case → test.
//!
//! Each composite level is a [`level::Level`] driven by [`level::run_level`]; the leaf is
//! [`TestRunner`]. Runners borrow the object model and own nothing but their slice of cases.

mod assembly;
mod case;
mod class;
mod collection;
mod context;
mod level;
mod method;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::TestCase;

pub use assembly::TestAssemblyRunner;
pub use case::TestCaseRunner;
pub use class::TestClassRunner;
pub use collection::TestCollectionRunner;
pub use context::RunContext;
pub use method::TestMethodRunner;
pub use test::TestRunner;

/// Group cases under their parent unit, keeping first-seen order of parents and cases.
fn group_by_parent<P>(
    cases: &[Arc<TestCase>],
    parent: impl Fn(&TestCase) -> &Arc<P>,
    key: impl Fn(&P) -> String,
) -> Vec<(Arc<P>, Vec<Arc<TestCase>>)> {
    let mut groups: IndexMap<String, (Arc<P>, Vec<Arc<TestCase>>)> = IndexMap::new();
    for case in cases {
        let owner = parent(case);
        groups
            .entry(key(owner))
            .or_insert_with(|| (Arc::clone(owner), Vec::new()))
            .1
            .push(Arc::clone(case));
    }
    groups.into_values().collect()
}
