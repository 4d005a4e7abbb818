use crate::value::Value;

/// A closed, named set of singleton values with stable ordinal positions.
///
/// Usually derived with `#[derive(Enumeration)]`, which also provides
/// `From<T> for Value`.
pub trait Enumeration: Copy + 'static {
    const TYPE_NAME: &'static str;

    fn name(&self) -> &'static str;

    /// Zero-based position among the declared values.
    fn ordinal(&self) -> usize;

    /// All values in declaration order.
    fn values() -> &'static [Self];

    fn of_name(name: &str) -> Option<Self> {
        Self::values().iter().copied().find(|it| it.name() == name)
    }

    fn of_ordinal(ordinal: usize) -> Option<Self> {
        Self::values().get(ordinal).copied()
    }

    fn to_enumeration_value(&self) -> EnumerationValue {
        EnumerationValue {
            type_name: Self::TYPE_NAME,
            name: self.name(),
            ordinal: self.ordinal(),
        }
    }

    fn to_value(&self) -> Value {
        Value::Enumeration(self.to_enumeration_value())
    }
}

/// Type-erased enumeration instance carried inside a [`Value`]. Two instances
/// are equal when their type, name and ordinal tags are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumerationValue {
    pub type_name: &'static str,
    pub name: &'static str,
    pub ordinal: usize,
}

impl EnumerationValue {
    pub fn is<E: Enumeration>(&self) -> bool {
        self.type_name == E::TYPE_NAME
    }

    /// Recovers the typed value when this instance belongs to `E`.
    pub fn downcast<E: Enumeration>(&self) -> Option<E> {
        if self.is::<E>() {
            E::of_ordinal(self.ordinal)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Enumeration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Enumeration)]
    enum Bool {
        False,
        True,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Enumeration)]
    enum Tri {
        #[enumeration(name = "no")]
        No,
        Maybe,
        Yes,
    }

    #[test]
    fn test_names_and_ordinals() {
        assert_eq!(Bool::True.name(), "TRUE");
        assert_eq!(Bool::True.ordinal(), 1);
        assert_eq!(Bool::values(), &[Bool::False, Bool::True]);
        assert_eq!(Bool::TYPE_NAME, "Bool");
        assert_eq!(Tri::No.name(), "no");
        assert_eq!(Tri::Yes.ordinal(), 2);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(Bool::of_name("FALSE"), Some(Bool::False));
        assert_eq!(Bool::of_name("false"), None);
        assert_eq!(Tri::of_ordinal(1), Some(Tri::Maybe));
        assert_eq!(Tri::of_ordinal(3), None);
    }

    #[test]
    fn test_identity_is_by_tag() {
        let t = Bool::True.to_enumeration_value();
        assert!(t.is::<Bool>());
        assert!(!t.is::<Tri>());
        assert_eq!(t.downcast::<Bool>(), Some(Bool::True));
        assert_eq!(t.downcast::<Tri>(), None);
        assert_ne!(t, Tri::Maybe.to_enumeration_value());
        assert_eq!(Value::from(Bool::True), Value::Enumeration(t));
    }
}
