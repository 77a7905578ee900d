//! Ordered name registries for instruments and visualizers.
//!
//! A registry is a fixed ordered catalogue populated at startup. Entries are
//! plain value descriptors; lookup is by display name or position.

use crate::error::Error;

/// Implemented by descriptors that carry a unique display name.
pub trait Descriptor {
    fn name(&self) -> &str;
}

/// How to pick an entry out of a registry.
#[derive(Debug, Clone, Copy)]
pub enum Selector<'a> {
    Name(&'a str),
    Index(usize),
}

#[derive(Debug, Default)]
pub struct Registry<T> {
    items: Vec<T>,
}

impl<T: Descriptor> Registry<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends a descriptor. Fails with `DuplicateName` if an entry with the
    /// same display name is already present, leaving the registry unchanged.
    pub fn register(&mut self, item: T) -> Result<(), Error> {
        if self.items.iter().any(|i| i.name() == item.name()) {
            return Err(Error::DuplicateName(item.name().to_string()));
        }
        self.items.push(item);
        Ok(())
    }

    /// Entries in registration order.
    pub fn list(&self) -> &[T] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Position of the named entry, if registered.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|i| i.name() == name)
    }

    /// Looks up an entry by name or index; `NotFound` if absent.
    pub fn select(&self, selector: Selector<'_>) -> Result<&T, Error> {
        match selector {
            Selector::Name(name) => self
                .items
                .iter()
                .find(|i| i.name() == name)
                .ok_or_else(|| Error::NotFound(name.to_string())),
            Selector::Index(index) => self
                .items
                .get(index)
                .ok_or_else(|| Error::NotFound(format!("index {index}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Descriptor for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn registers_and_selects_in_order() {
        let mut registry = Registry::new();
        registry.register(Named("Piano")).unwrap();
        registry.register(Named("Flute")).unwrap();

        assert_eq!(registry.list().len(), 2);
        assert_eq!(registry.select(Selector::Name("Flute")).unwrap().name(), "Flute");
        assert_eq!(registry.select(Selector::Index(0)).unwrap().name(), "Piano");
        assert_eq!(registry.position("Flute"), Some(1));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = Registry::new();
        registry.register(Named("Piano")).unwrap();
        let err = registry.register(Named("Piano")).unwrap_err();
        assert_eq!(err, Error::DuplicateName("Piano".to_string()));
        // Exactly one entry with that name survives.
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn missing_entries_return_not_found() {
        let registry: Registry<Named> = Registry::new();
        assert!(matches!(
            registry.select(Selector::Name("Theremin")),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            registry.select(Selector::Index(3)),
            Err(Error::NotFound(_))
        ));
    }
}
