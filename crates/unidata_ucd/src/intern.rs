use std::{collections::HashSet, rc::Rc};

/// Deduplicates string values, so every codepoint with the same value shares one allocation
#[derive(Default)]
pub struct Interner {
    strings : HashSet<Rc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Rc<str> {
        if let Some(rc) = self.strings.get(s) {
            return rc.clone();
        }
        let rc: Rc<str> = Rc::from(s);
        self.strings.insert(rc.clone());
        rc
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_value_same_allocation() {
        let mut interner = Interner::new();
        let a = interner.intern("Basic Latin");
        let b = interner.intern(&String::from("Basic Latin"));
        assert!(Rc::ptr_eq(&a, &b));

        interner.intern("Latin-1 Supplement");
        assert_eq!(interner.len(), 2);
    }
}
