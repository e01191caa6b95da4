use crate::{ClassFileError, Result};

#[macro_export]
macro_rules! matches_cp_info {
    ($cp:expr, $index:expr, $i:ident) => {
        match $cp.get($index)? {
            $crate::constant_pool::CpInfo::$i(ref n) => Ok(n),
            c => Err($crate::ClassFileError::WrongConstantKind {
                index: $index,
                expected: stringify!($i),
                found: c.clone(),
            }),
        }
    };
}

/// The 1-indexed constant pool of a class file.
///
/// Slot `i` of the pool lives at `cp_infos[i - 1]`. `Long` and `Double`
/// entries are followed by a [`CpInfo::Unusable`] slot which can never be
/// looked up.
#[derive(Debug, Default)]
pub struct ConstantPool {
    cp_infos: Vec<CpInfo>,
}
impl ConstantPool {
    pub fn new(cp_infos: Vec<CpInfo>) -> Self {
        Self { cp_infos }
    }

    /// Number of addressable slots, phantom slots included.
    pub fn len(&self) -> usize {
        self.cp_infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cp_infos.is_empty()
    }

    /// The on-disk `constant_pool_count`, which is one more than the number of slots.
    pub fn count(&self) -> usize {
        self.cp_infos.len() + 1
    }

    pub fn get(&self, index: u16) -> Result<&CpInfo> {
        if index == 0 {
            return Err(ClassFileError::InvalidPoolIndex(index));
        }

        match self.cp_infos.get(index as usize - 1) {
            Some(CpInfo::Unusable) | None => Err(ClassFileError::InvalidPoolIndex(index)),
            Some(cp_info) => Ok(cp_info),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        matches_cp_info!(self, index, Utf8).map(String::as_str)
    }

    /// Resolves a `Class` entry to its binary name.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        let ClassInfo { name_index } = matches_cp_info!(self, index, Class)?;
        self.utf8(*name_index)
    }

    /// Resolves `index` to text, following at most one indirection.
    ///
    /// `Utf8` entries resolve to themselves. `Class`, `String`, `MethodType`,
    /// `Module` and `Package` entries resolve through the single index they hold,
    /// which must point at a `Utf8` entry. The referenced `Utf8` text is never
    /// parsed as a number and resolved a second time.
    pub fn text(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            CpInfo::Utf8(s) => Ok(s.as_str()),
            CpInfo::Class(ClassInfo { name_index })
            | CpInfo::Module { name_index }
            | CpInfo::Package { name_index } => self.utf8(*name_index),
            CpInfo::String { string_index } => self.utf8(*string_index),
            CpInfo::MethodType(MethodTypeInfo { descriptor_index }) => {
                self.utf8(*descriptor_index)
            }
            c => Err(ClassFileError::WrongConstantKind {
                index,
                expected: "text",
                found: c.clone(),
            }),
        }
    }

    /// Iterates over `(index, entry)` pairs, skipping phantom slots.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &CpInfo)> + '_ {
        self.cp_infos
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, CpInfo::Unusable))
            .map(|(i, c)| (i as u16 + 1, c))
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum CpInfo {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(ClassInfo),
    String { string_index: u16 },
    FieldRef(RefInfo),
    MethodRef(RefInfo),
    InterfaceMethodRef(RefInfo),
    NameAndType(NameAndTypeInfo),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    Dynamic(DynamicInfo),
    InvokeDynamic(DynamicInfo),
    Module { name_index: u16 },
    Package { name_index: u16 },
    Unusable,
}
impl CpInfo {
    /// Wide entries take up two slots in the pool.
    pub fn is_wide(&self) -> bool {
        matches!(self, CpInfo::Long(_) | CpInfo::Double(_))
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ClassInfo {
    // The constant_pool entry at name_index must be a CONSTANT_Utf8_info structure
    // representing a valid binary class or interface name encoded in internal form.
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

/// Shared shape of `CONSTANT_Dynamic_info` and `CONSTANT_InvokeDynamic_info`.
#[derive(Debug, PartialEq, Clone)]
pub struct DynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}

#[cfg(test)]
mod get_tests {
    use super::*;

    fn pool() -> ConstantPool {
        ConstantPool::new(vec![
            CpInfo::Utf8("java/lang/Object".into()),
            CpInfo::Long(42),
            CpInfo::Unusable,
            CpInfo::Class(ClassInfo { name_index: 1 }),
            CpInfo::String { string_index: 1 },
            CpInfo::Integer(7),
            CpInfo::Class(ClassInfo { name_index: 6 }),
        ])
    }

    #[test]
    fn it_should_resolve_valid_indices() {
        let pool = pool();

        assert_eq!(pool.get(2).unwrap(), &CpInfo::Long(42));
        assert_eq!(pool.utf8(1).unwrap(), "java/lang/Object");
        assert_eq!(pool.count(), 8);
    }

    #[test]
    fn it_should_fail_on_index_zero() {
        assert!(matches!(
            pool().get(0),
            Err(ClassFileError::InvalidPoolIndex(0))
        ));
    }

    #[test]
    fn it_should_fail_past_the_end() {
        assert!(matches!(
            pool().get(8),
            Err(ClassFileError::InvalidPoolIndex(8))
        ));
    }

    #[test]
    fn it_should_fail_on_a_phantom_slot() {
        assert!(matches!(
            pool().get(3),
            Err(ClassFileError::InvalidPoolIndex(3))
        ));
    }

    #[test]
    fn it_should_fail_on_the_wrong_kind() {
        assert!(matches!(
            pool().utf8(2),
            Err(ClassFileError::WrongConstantKind {
                index: 2,
                expected: "Utf8",
                ..
            })
        ));
    }

    #[test]
    fn it_should_skip_phantom_slots_when_iterating() {
        let indices = pool().iter().map(|(i, _)| i).collect::<Vec<_>>();

        assert_eq!(indices, vec![1, 2, 4, 5, 6, 7]);
    }
}
