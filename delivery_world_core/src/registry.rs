use crate::error::RegistryError;

/// Named table of rule factories for one rule category.
///
/// Entries keep their registration order; `names` reports them in that order.
#[derive(Debug, Clone)]
pub struct RuleRegistry<F> {
    category: &'static str,
    entries: Vec<(String, F)>,
}

impl<F> RuleRegistry<F> {
    pub fn new(category: &'static str) -> Self {
        RuleRegistry {
            category,
            entries: Vec::new(),
        }
    }

    pub fn category(&self) -> &'static str {
        self.category
    }

    /// Adds `entry` under `name`. Fails if the name is already taken.
    pub fn register(&mut self, name: impl Into<String>, entry: F) -> Result<(), RegistryError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(RegistryError::NameConflict {
                category: self.category,
                name,
            });
        }
        self.entries.push((name, entry));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&F, RegistryError> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, entry)| entry)
            .ok_or_else(|| RegistryError::NotFound {
                category: self.category,
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(entry_name, _)| entry_name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
