use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use anyhow::{bail, Result};

use super::Stage;

/// Typed handle to a resource owned by a [`ResourceStack`].
///
/// Slots are invalidated by [`ResourceStack::release_all`]; lookups through a
/// stale slot return `None`.
pub struct Slot<T> {
    index: usize,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slot<T> {}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

struct Entry {
    stage: Stage,
    label: &'static str,
    resource: Box<dyn Any>,
}

/// Owns resources in acquisition order and releases them in reverse.
///
/// Pushing a resource of an earlier [`Stage`] than the last one pushed is
/// rejected: it would mean a dependency is created after its dependent.
#[derive(Default)]
pub struct ResourceStack {
    entries: Vec<Entry>,
    generation: u32,
}

impl ResourceStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `resource` as the newest link of the chain.
    pub fn push<T: Any>(&mut self, stage: Stage, label: &'static str, resource: T) -> Result<Slot<T>> {
        if let Some(last) = self.entries.last() {
            if stage < last.stage {
                bail!(
                    "cannot acquire {stage} `{label}` after {} `{}`: creation order violated",
                    last.stage,
                    last.label
                );
            }
        }

        log::trace!("acquired {stage} `{label}`");

        self.entries.push(Entry {
            stage,
            label,
            resource: Box::new(resource),
        });

        Ok(Slot {
            index: self.entries.len() - 1,
            generation: self.generation,
            _marker: PhantomData,
        })
    }

    /// Returns the resource behind `slot`, if it has not been released.
    pub fn get<T: Any>(&self, slot: Slot<T>) -> Option<&T> {
        if slot.generation != self.generation {
            return None;
        }
        self.entries
            .get(slot.index)
            .and_then(|entry| entry.resource.downcast_ref::<T>())
    }

    /// Stage and label of each owned resource, oldest first.
    pub fn stages(&self) -> impl Iterator<Item = (Stage, &'static str)> + '_ {
        self.entries.iter().map(|e| (e.stage, e.label))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Releases every resource, newest first.
    ///
    /// Outstanding slots become stale. The stack can be refilled afterwards.
    pub fn release_all(&mut self) {
        if self.entries.is_empty() {
            return;
        }

        while let Some(entry) = self.entries.pop() {
            log::trace!("releasing {} `{}`", entry.stage, entry.label);
            drop(entry.resource);
        }

        self.generation = self.generation.wrapping_add(1);
    }
}

impl Drop for ResourceStack {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    type Journal = Rc<RefCell<Vec<String>>>;

    /// Mock handle that records its own acquisition and release.
    struct Tracked {
        name: String,
        journal: Journal,
    }

    impl Tracked {
        fn acquire(name: impl Into<String>, journal: &Journal) -> Self {
            let name = name.into();
            journal.borrow_mut().push(format!("acquire {name}"));
            Self {
                name,
                journal: Rc::clone(journal),
            }
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.journal.borrow_mut().push(format!("release {}", self.name));
        }
    }

    const CHAIN: [Stage; 8] = [
        Stage::Shader,
        Stage::BindGroupLayout,
        Stage::PipelineLayout,
        Stage::Pipeline,
        Stage::Buffer,
        Stage::Buffer,
        Stage::Buffer,
        Stage::BindGroup,
    ];

    fn acquisitions(journal: &Journal) -> Vec<String> {
        journal
            .borrow()
            .iter()
            .filter_map(|e| e.strip_prefix("acquire ").map(str::to_owned))
            .collect()
    }

    fn releases(journal: &Journal) -> Vec<String> {
        journal
            .borrow()
            .iter()
            .filter_map(|e| e.strip_prefix("release ").map(str::to_owned))
            .collect()
    }

    // ── teardown order ────────────────────────────────────────────────────

    #[test]
    fn teardown_is_reverse_of_acquisition_for_every_length() {
        for n in 1..=CHAIN.len() {
            let journal = Journal::default();
            {
                let mut stack = ResourceStack::new();
                for (i, stage) in CHAIN.iter().take(n).enumerate() {
                    let tracked = Tracked::acquire(format!("r{i}"), &journal);
                    stack.push(*stage, "tracked", tracked).unwrap();
                }
                assert!(releases(&journal).is_empty());
            }

            let mut expected = acquisitions(&journal);
            expected.reverse();
            assert_eq!(releases(&journal), expected, "n = {n}");
        }
    }

    #[test]
    fn release_all_is_reverse_and_idempotent() {
        let journal = Journal::default();
        let mut stack = ResourceStack::new();
        stack.push(Stage::Shader, "a", Tracked::acquire("a", &journal)).unwrap();
        stack.push(Stage::Pipeline, "b", Tracked::acquire("b", &journal)).unwrap();
        stack.push(Stage::BindGroup, "c", Tracked::acquire("c", &journal)).unwrap();

        stack.release_all();
        stack.release_all();
        drop(stack);

        assert_eq!(releases(&journal), ["c", "b", "a"]);
    }

    // ── creation order ────────────────────────────────────────────────────

    #[test]
    fn rejects_dependency_after_dependent() {
        let mut stack = ResourceStack::new();
        stack.push(Stage::Pipeline, "pipeline", 1u32).unwrap();

        let err = stack.push(Stage::Shader, "shader", 2u32).unwrap_err();

        assert!(err.to_string().contains("creation order violated"));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn same_stage_may_repeat() {
        let mut stack = ResourceStack::new();
        stack.push(Stage::Buffer, "vertex", 1u8).unwrap();
        stack.push(Stage::Buffer, "index", 2u8).unwrap();
        assert_eq!(
            stack.stages().collect::<Vec<_>>(),
            [(Stage::Buffer, "vertex"), (Stage::Buffer, "index")]
        );
    }

    #[test]
    fn refill_after_release_restarts_the_chain() {
        let mut stack = ResourceStack::new();
        stack.push(Stage::BindGroup, "old", 0u8).unwrap();
        stack.release_all();

        assert!(stack.push(Stage::Shader, "new", 1u8).is_ok());
    }

    // ── slots ─────────────────────────────────────────────────────────────

    #[test]
    fn slots_resolve_to_their_resource() {
        let mut stack = ResourceStack::new();
        let a = stack.push(Stage::Buffer, "a", String::from("alpha")).unwrap();
        let b = stack.push(Stage::Buffer, "b", 99u64).unwrap();

        assert_eq!(stack.get(a).map(String::as_str), Some("alpha"));
        assert_eq!(stack.get(b), Some(&99));
    }

    #[test]
    fn stale_slot_returns_none() {
        let mut stack = ResourceStack::new();
        let slot = stack.push(Stage::Buffer, "a", 5i32).unwrap();
        stack.release_all();
        stack.push(Stage::Buffer, "b", 6i32).unwrap();

        assert_eq!(stack.get(slot), None);
    }
}
