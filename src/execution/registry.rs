use std::collections::BTreeMap;
use std::fmt;

use super::PipelineUnit;

/// Units of one phase, keyed by name.
#[derive(Default)]
pub struct UnitRegistry {
    units: BTreeMap<String, Box<dyn PipelineUnit>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `unit` under its own name, replacing (and returning) any unit of the same name.
    pub fn register(&mut self, unit: Box<dyn PipelineUnit>) -> Option<Box<dyn PipelineUnit>> {
        self.units.insert(unit.name().to_string(), unit)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn PipelineUnit + 'static)> {
        self.units.get_mut(name).map(|u| u.as_mut())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.units.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::UnitRegistry;
    use crate::error::PipelineResult;
    use crate::execution::PipelineUnit;
    use crate::types::UnitOutcome;

    struct Named(&'static str, &'static str);

    impl PipelineUnit for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn run(&mut self) -> PipelineResult<UnitOutcome> {
            Ok(UnitOutcome::ok(self.1))
        }
    }

    #[test]
    fn register_replaces_same_name() {
        let mut reg = UnitRegistry::new();
        assert!(reg.register(Box::new(Named("treasury", "first"))).is_none());
        assert!(reg.register(Box::new(Named("sbs_bcrp", "only"))).is_none());
        let old = reg.register(Box::new(Named("treasury", "second")));
        assert!(old.is_some());

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["sbs_bcrp", "treasury"]);
        let out = reg.get_mut("treasury").unwrap().run().unwrap();
        assert_eq!(out.message, "second");
        assert!(!reg.contains("curva_dolares"));
    }
}
