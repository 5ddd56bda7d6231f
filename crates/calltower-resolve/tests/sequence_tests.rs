use super::*;
use crate::declarations::{ContainerId, Declaration, DeclarationKind, DeclarationStore};
use crate::tower::{DeclarationLevel, ImplicitScopeTower, LevelLookup};
use crate::visibility::ContainerTree;
use calltower_solver::{TypeDatabase, TypeInterner};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Level that counts how often it is asked.
struct CountingLevel {
    inner: DeclarationLevel,
    queries: Arc<AtomicUsize>,
}

impl ScopeTowerLevel for CountingLevel {
    fn variables(&self, ctx: &LookupContext<'_>, name: Atom, ext: Option<&ReceiverValue>) -> LevelLookup {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.variables(ctx, name, ext)
    }

    fn objects(&self, ctx: &LookupContext<'_>, name: Atom, ext: Option<&ReceiverValue>) -> LevelLookup {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.objects(ctx, name, ext)
    }

    fn functions(&self, ctx: &LookupContext<'_>, name: Atom, ext: Option<&ReceiverValue>) -> LevelLookup {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.functions(ctx, name, ext)
    }

    fn description(&self) -> &'static str {
        "counting"
    }
}

struct Setup {
    interner: TypeInterner,
    tree: ContainerTree,
    store: DeclarationStore,
    pkg: ContainerId,
}

fn setup() -> Setup {
    let interner = TypeInterner::new();
    let mut tree = ContainerTree::new();
    let module = tree.add_module(interner.intern_string("app"));
    let pkg = tree.add_package(interner.intern_string("app"), module);
    Setup {
        interner,
        tree,
        store: DeclarationStore::new(),
        pkg,
    }
}

impl Setup {
    fn function(&self, name: &str) -> Arc<Declaration> {
        self.store.add(Declaration::new(
            self.interner.intern_string(name),
            DeclarationKind::Function,
            self.pkg,
        ))
    }

    fn counting(&self, level: DeclarationLevel) -> (CountingLevel, Arc<AtomicUsize>) {
        let queries = Arc::new(AtomicUsize::new(0));
        (
            CountingLevel {
                inner: level,
                queries: Arc::clone(&queries),
            },
            queries,
        )
    }
}

#[test]
fn test_levels_are_queried_lazily() {
    let s = setup();
    let (first, first_queries) = s.counting(DeclarationLevel::importing(vec![s.function("f")]));
    let (second, second_queries) = s.counting(DeclarationLevel::importing(vec![s.function("f")]));
    let mut tower = ImplicitScopeTower::new(&s.interner, &s.tree, s.pkg);
    tower.push_level(first);
    tower.push_level(second);

    let mut sequence = tower.candidates(LookupKind::Function, s.interner.intern_string("f"), None);
    assert!(sequence.advance().unwrap().is_some());
    assert_eq!(first_queries.load(Ordering::SeqCst), 1);
    assert_eq!(second_queries.load(Ordering::SeqCst), 0);

    assert!(sequence.advance().unwrap().is_some());
    assert!(sequence.advance().unwrap().is_none());
    assert!(sequence.advance().unwrap().is_none());
    assert_eq!(second_queries.load(Ordering::SeqCst), 1);
}

#[test]
fn test_exclusive_level_stops_the_search() {
    let s = setup();
    let (outer, outer_queries) = s.counting(DeclarationLevel::importing(vec![s.function("f")]));
    let mut tower = ImplicitScopeTower::new(&s.interner, &s.tree, s.pkg);
    tower.push_level(DeclarationLevel::local(vec![s.function("f"), s.function("f")]));
    tower.push_level(outer);

    let all = tower
        .candidates(LookupKind::Function, s.interner.intern_string("f"), None)
        .collect_all()
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(outer_queries.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancellation_fails_the_sequence_for_good() {
    let s = setup();
    let token = CancellationToken::new();
    let mut tower = ImplicitScopeTower::new(&s.interner, &s.tree, s.pkg).with_cancellation(token.clone());
    tower.push_level(DeclarationLevel::importing(vec![s.function("f")]));
    tower.push_level(DeclarationLevel::importing(vec![s.function("f")]));

    let mut sequence = tower.candidates(LookupKind::Function, s.interner.intern_string("f"), None);
    assert!(sequence.advance().unwrap().is_some());
    token.cancel();
    assert_eq!(sequence.advance(), Err(Cancelled));
    assert_eq!(sequence.advance(), Err(Cancelled));
}

#[test]
fn test_iterator_reports_cancellation_once() {
    let s = setup();
    let token = CancellationToken::new();
    token.cancel();
    let mut tower = ImplicitScopeTower::new(&s.interner, &s.tree, s.pkg).with_cancellation(token);
    tower.push_level(DeclarationLevel::importing(vec![s.function("f")]));

    let results: Vec<_> = tower
        .candidates(LookupKind::Function, s.interner.intern_string("f"), None)
        .collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}

#[test]
fn test_empty_tower_is_done_immediately() {
    let s = setup();
    let tower = ImplicitScopeTower::new(&s.interner, &s.tree, s.pkg);
    let mut sequence = tower.candidates(LookupKind::Variable, s.interner.intern_string("x"), None);
    assert_eq!(sequence.advance(), Ok(None));
}
