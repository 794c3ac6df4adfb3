//! Fixture discovery and loading.
//!
//! Fixtures are registered in-process under path-like references. A
//! reference is a fixture if its file stem ends with [`FIXTURE_SUFFIX`];
//! discovery selects the registered fixtures that live under the requested
//! search paths.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::error::{HarnessError, HarnessResult};
use crate::fixture::FixtureRef;
use crate::module::{GlobalHooks, TestModule};

/// File stem suffix that marks a fixture
pub const FIXTURE_SUFFIX: &str = "_fixture";

/// Supplies fixtures to the orchestrator.
pub trait FixtureSource: Send + Sync {
    /// Fixtures under `paths`, in a stable order
    fn discover(&self, paths: &[PathBuf]) -> Vec<FixtureRef>;

    /// Resolve a fixture reference to its module
    fn load(&self, fixture: &FixtureRef) -> HarnessResult<TestModule>;

    /// Suite-wide hooks, if any are defined
    fn global_hooks(&self) -> Option<GlobalHooks> {
        None
    }
}

/// Whether `fixture` follows the fixture naming convention
pub fn is_fixture(fixture: &FixtureRef) -> bool {
    fixture
        .as_path()
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.ends_with(FIXTURE_SUFFIX))
}

/// Drop `.` components so `./math` and `math` select the same fixtures.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

type ModuleFactory = Arc<dyn Fn() -> TestModule + Send + Sync>;

/// In-process fixture registry
#[derive(Clone, Default)]
pub struct Registry {
    fixtures: Vec<(FixtureRef, ModuleFactory)>,
    global: Option<GlobalHooks>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixture. Registering the same reference again replaces
    /// the factory but keeps the original position.
    pub fn with_fixture<F>(mut self, fixture: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> TestModule + Send + Sync + 'static,
    {
        let fixture = FixtureRef::new(fixture);
        let factory: ModuleFactory = Arc::new(factory);
        match self.fixtures.iter_mut().find(|(existing, _)| *existing == fixture) {
            Some(slot) => slot.1 = factory,
            None => self.fixtures.push((fixture, factory)),
        }
        self
    }

    pub fn with_global_hooks(mut self, hooks: GlobalHooks) -> Self {
        self.global = Some(hooks);
        self
    }

    /// Every registered reference in registration order
    pub fn fixtures(&self) -> impl Iterator<Item = &FixtureRef> {
        self.fixtures.iter().map(|(fixture, _)| fixture)
    }
}

impl FixtureSource for Registry {
    fn discover(&self, paths: &[PathBuf]) -> Vec<FixtureRef> {
        let mut found = Vec::new();
        for path in paths {
            let wanted = normalize(path);
            let before = found.len();
            found.extend(
                self.fixtures()
                    .filter(|fixture| is_fixture(fixture))
                    .filter(|fixture| normalize(fixture.as_path()).starts_with(&wanted))
                    .cloned(),
            );
            if found.len() == before {
                tracing::warn!(path = %path.display(), "no fixtures found");
            }
        }
        found
    }

    fn load(&self, fixture: &FixtureRef) -> HarnessResult<TestModule> {
        self.fixtures
            .iter()
            .find(|(existing, _)| existing == fixture)
            .map(|(_, factory)| factory())
            .ok_or_else(|| HarnessError::FixtureNotFound(fixture.to_string()))
    }

    fn global_hooks(&self) -> Option<GlobalHooks> {
        self.global.clone()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("fixtures", &self.fixtures().collect::<Vec<_>>())
            .field("global", &self.global.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new()
            .with_fixture("math/add_fixture", TestModule::new)
            .with_fixture("math/helpers", TestModule::new)
            .with_fixture("io/read_fixture.rs", TestModule::new)
            .with_fixture("math/deep/mul_fixture", TestModule::new)
            .with_fixture("mathematics/other_fixture", TestModule::new)
    }

    fn names(found: Vec<FixtureRef>) -> Vec<String> {
        found.into_iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_current_dir_selects_every_fixture() {
        let found = registry().discover(&[PathBuf::from(".")]);
        assert_eq!(
            names(found),
            vec![
                "math/add_fixture",
                "io/read_fixture.rs",
                "math/deep/mul_fixture",
                "mathematics/other_fixture"
            ]
        );
    }

    #[test]
    fn test_path_prefix_matches_whole_components() {
        let found = registry().discover(&[PathBuf::from("./math")]);
        assert_eq!(names(found), vec!["math/add_fixture", "math/deep/mul_fixture"]);
    }

    #[test]
    fn test_paths_are_searched_in_order() {
        let found = registry().discover(&[PathBuf::from("io"), PathBuf::from("math/deep")]);
        assert_eq!(names(found), vec!["io/read_fixture.rs", "math/deep/mul_fixture"]);
    }

    #[test]
    fn test_explicit_non_fixture_is_ignored() {
        let found = registry().discover(&[PathBuf::from("math/helpers")]);
        assert!(found.is_empty());
    }

    #[test]
    fn test_load_unknown_fixture_fails() {
        let err = registry().load(&FixtureRef::new("nope_fixture")).unwrap_err();
        assert!(matches!(err, HarnessError::FixtureNotFound(ref name) if name == "nope_fixture"));
    }

    #[test]
    fn test_global_hooks_are_optional() {
        assert!(registry().global_hooks().is_none());
        let with_global = registry().with_global_hooks(GlobalHooks::new());
        assert!(with_global.global_hooks().is_some());
    }
}
