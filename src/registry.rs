//! The process-wide transform registry.
//!
//! Transform classes are keyed by name and then by the input-format id they
//! accept, mirroring how the tree resolves them: an exact format match wins,
//! otherwise the first registered factory is returned and the caller knows a
//! format converter has to be interposed.
//!
//! The registry is populated exactly once, on first use, and is read-only
//! afterwards, so concurrent lookups are safe without locking.

use once_cell::sync::Lazy;

use crate::format::FormatId;
use crate::transform::Transform;
use crate::transforms;

/// Produces a fresh default-parameter instance of one transform class.
pub type TransformFactory = fn() -> Box<dyn Transform>;

struct ClassEntry {
    name: &'static str,
    /// Insertion order matters: the first factory is the fallback when no
    /// input format matches exactly.
    factories: Vec<(FormatId, TransformFactory)>,
}

/// The registry itself. Obtain it through [`Registry::global`].
pub struct Registry {
    classes: Vec<ClassEntry>,
}

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry {
        classes: Vec::new(),
    };
    for factory in transforms::builtin_factories() {
        registry.register(factory);
    }
    log::debug!(
        "transform registry initialized with {} classes",
        registry.classes.len()
    );
    registry
});

impl Registry {
    pub fn global() -> &'static Registry {
        &REGISTRY
    }

    fn register(&mut self, factory: TransformFactory) {
        let probe = factory();
        let name = probe.name();
        let input = probe.input_format().id();
        match self.classes.iter_mut().find(|c| c.name == name) {
            Some(entry) => entry.factories.push((input, factory)),
            None => self.classes.push(ClassEntry {
                name,
                factories: vec![(input, factory)],
            }),
        }
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c.name == class)
    }

    /// Instantiates `class` for the given input format. The second value is
    /// false when the registry fell back to the first registered factory,
    /// which signals the tree builder that a converter may be required.
    pub fn create(&self, class: &str, input: FormatId) -> Option<(Box<dyn Transform>, bool)> {
        let entry = self.classes.iter().find(|c| c.name == class)?;
        if let Some((_, factory)) = entry.factories.iter().find(|(id, _)| *id == input) {
            return Some((factory(), true));
        }
        let (_, fallback) = entry.factories.first()?;
        Some((fallback(), false))
    }

    /// Names of all registered classes, in registration order.
    pub fn classes(&self) -> Vec<&'static str> {
        self.classes.iter().map(|c| c.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_classes_are_present() {
        let registry = Registry::global();
        for class in [
            "Window",
            "RDFT",
            "IRDFT",
            "DCT",
            "IDCT",
            "ComplexMagnitude",
            "SpectralEnergy",
            "FilterBank",
            "Log",
            "Selector",
            "STMSN",
            "Energy",
            "Merge",
            "Stats",
            "Preemphasis",
        ] {
            assert!(registry.contains(class), "missing class {class}");
        }
    }

    #[test]
    fn exact_format_match_is_preferred() {
        let registry = Registry::global();
        let (window, exact) = registry.create("Window", FormatId::Real).unwrap();
        assert!(exact);
        assert_eq!(window.input_format().id(), FormatId::Real);

        // Window is registered for float input only, so an int16 request
        // falls back and reports the mismatch.
        let (_, exact) = registry.create("Window", FormatId::Int16).unwrap();
        assert!(!exact);
    }

    #[test]
    fn unknown_class_is_absent() {
        assert!(Registry::global().create("Nonsense", FormatId::Real).is_none());
        assert!(!Registry::global().contains("Nonsense"));
    }

    #[test]
    fn registered_set_is_stable() {
        let first = Registry::global().classes();
        let second = Registry::global().classes();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
