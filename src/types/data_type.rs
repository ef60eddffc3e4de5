//! # Closed Data Type Enumeration
//!
//! `DataType` names every kind of value the record format can carry. It holds
//! no layout logic beyond the intrinsic byte size of the fixed-size primitives;
//! the size of composite kinds comes from their [`Schema`](crate::schema::Schema).
//!
//! ## Type Categories
//!
//! | Category | Types | Size |
//! |----------|-------|------|
//! | **Fixed primitives** | Void, Boolean, Int32, Int64, Float64, Decimal, DateTime, TimeSpan, Guid | 0-16 bytes |
//! | **Variable primitives** | String, Binary, ItemPath | length-prefixed |
//! | **Enumerations** | Choice (Int32), MultiChoice (List of Int32) | 4 / variable |
//! | **Containers** | Class, List | from schema |
//!
//! ## Discriminant Values
//!
//! Discriminants are stable and grouped by category:
//! - 0-8: fixed primitives
//! - 20-22: variable primitives
//! - 30-31: enumerations
//! - 40-41: containers

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Void = 0,
    Boolean = 1,
    Int32 = 2,
    Int64 = 3,
    Float64 = 4,
    Decimal = 5,
    DateTime = 6,
    TimeSpan = 7,
    Guid = 8,

    String = 20,
    Binary = 21,
    ItemPath = 22,

    Choice = 30,
    MultiChoice = 31,

    Class = 40,
    List = 41,
}

impl DataType {
    /// Intrinsic byte size of a fixed-size primitive, or None for every other kind.
    pub fn intrinsic_size(&self) -> Option<usize> {
        match self {
            DataType::Void => Some(0),
            DataType::Boolean => Some(1),
            DataType::Int32 | DataType::Choice => Some(4),
            DataType::Int64 | DataType::Float64 | DataType::DateTime | DataType::TimeSpan => {
                Some(8)
            }
            DataType::Decimal | DataType::Guid => Some(16),
            DataType::String
            | DataType::Binary
            | DataType::ItemPath
            | DataType::MultiChoice
            | DataType::Class
            | DataType::List => None,
        }
    }

    /// True for every kind that carries a single scalar value and has no fields.
    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            DataType::Class | DataType::List | DataType::MultiChoice
        )
    }

    /// True for the length-prefixed primitives.
    pub fn is_variable_primitive(&self) -> bool {
        matches!(
            self,
            DataType::String | DataType::Binary | DataType::ItemPath
        )
    }

    /// True for List and MultiChoice, which share the list wire format.
    pub fn is_list_like(&self) -> bool {
        matches!(self, DataType::List | DataType::MultiChoice)
    }
}

impl TryFrom<u8> for DataType {
    type Error = eyre::Report;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DataType::Void),
            1 => Ok(DataType::Boolean),
            2 => Ok(DataType::Int32),
            3 => Ok(DataType::Int64),
            4 => Ok(DataType::Float64),
            5 => Ok(DataType::Decimal),
            6 => Ok(DataType::DateTime),
            7 => Ok(DataType::TimeSpan),
            8 => Ok(DataType::Guid),
            20 => Ok(DataType::String),
            21 => Ok(DataType::Binary),
            22 => Ok(DataType::ItemPath),
            30 => Ok(DataType::Choice),
            31 => Ok(DataType::MultiChoice),
            40 => Ok(DataType::Class),
            41 => Ok(DataType::List),
            _ => eyre::bail!("invalid DataType discriminant: {}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intrinsic_sizes() {
        assert_eq!(DataType::Void.intrinsic_size(), Some(0));
        assert_eq!(DataType::Boolean.intrinsic_size(), Some(1));
        assert_eq!(DataType::Int32.intrinsic_size(), Some(4));
        assert_eq!(DataType::Choice.intrinsic_size(), Some(4));
        assert_eq!(DataType::Int64.intrinsic_size(), Some(8));
        assert_eq!(DataType::Decimal.intrinsic_size(), Some(16));
        assert_eq!(DataType::Guid.intrinsic_size(), Some(16));
        assert_eq!(DataType::String.intrinsic_size(), None);
        assert_eq!(DataType::Class.intrinsic_size(), None);
    }

    #[test]
    fn discriminant_roundtrip() {
        for dt in [
            DataType::Void,
            DataType::Guid,
            DataType::ItemPath,
            DataType::MultiChoice,
            DataType::List,
        ] {
            assert_eq!(DataType::try_from(dt as u8).unwrap(), dt);
        }
        assert!(DataType::try_from(99).is_err());
    }

    #[test]
    fn categories() {
        assert!(DataType::Choice.is_primitive());
        assert!(!DataType::MultiChoice.is_primitive());
        assert!(DataType::MultiChoice.is_list_like());
        assert!(DataType::Binary.is_variable_primitive());
        assert!(!DataType::Guid.is_variable_primitive());
    }
}
