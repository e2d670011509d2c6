use std::fmt;

/// Apparent type of a single field value.
///
/// Variants are ordered from most to least specific; [`Type::as_index`]
/// follows the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Type {
    Null,
    Boolean,
    Integer,
    Decimal,
    Date,
    DateTime,
    #[default]
    Text,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Type {
    /// Every variant, in index order.
    pub const ALL: [Type; 7] = [
        Type::Null,
        Type::Boolean,
        Type::Integer,
        Type::Decimal,
        Type::Date,
        Type::DateTime,
        Type::Text,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub const fn name(self) -> &'static str {
        match self {
            Type::Null => "Null",
            Type::Boolean => "Boolean",
            Type::Integer => "Integer",
            Type::Decimal => "Decimal",
            Type::Date => "Date",
            Type::DateTime => "DateTime",
            Type::Text => "Text",
        }
    }

    #[inline]
    pub const fn as_index(&self) -> usize {
        *self as usize
    }

    /// Inverse of [`Type::as_index`]. Out-of-range indices map to `Text`.
    pub const fn from_index(index: usize) -> Type {
        if index < Self::COUNT {
            Self::ALL[index]
        } else {
            Type::Text
        }
    }

    /// Returns true if this type is numeric.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Decimal)
    }

    /// Returns true if this type is temporal.
    #[inline]
    pub fn is_temporal(&self) -> bool {
        matches!(self, Type::Date | Type::DateTime)
    }

    /// Whether two values look like they belong in the same column.
    ///
    /// Integer and decimal agree, as do date and datetime.
    pub fn agrees_with(self, other: Type) -> bool {
        self == other
            || (self.is_numeric() && other.is_numeric())
            || (self.is_temporal() && other.is_temporal())
    }
}
