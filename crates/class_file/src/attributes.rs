use std::fmt;

use crate::ConstantPool;

pub const DEPRECATED: &str = "Deprecated";
pub const SYNTHETIC: &str = "Synthetic";
pub const SOURCE_FILE: &str = "SourceFile";
pub const CONSTANT_VALUE: &str = "ConstantValue";
pub const SIGNATURE: &str = "Signature";
pub const CODE: &str = "Code";

#[derive(PartialEq, Clone)]
pub struct Attribute {
    pub attribute_name_index: u16,
    pub info: AttributeInfo,
}
impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Attribute");
        s.field("attribute_name_index", &self.attribute_name_index);
        match &self.info {
            AttributeInfo::Opaque(info) => s.field("info", &format!("({} bytes)", info.len())),
            info => s.field("info", info),
        };
        s.finish()
    }
}

/// Decoded payload of an attribute, selected by the attribute's name.
///
/// Names without a dedicated variant keep their payload verbatim in `Opaque`.
#[derive(Debug, PartialEq, Clone)]
pub enum AttributeInfo {
    Deprecated,
    Synthetic,
    SourceFile { sourcefile_index: u16 },
    ConstantValue { constantvalue_index: u16 },
    Signature { signature_index: u16 },
    Code(CodeAttribute),
    Opaque(Vec<u8>),
}

#[derive(Debug, Default, PartialEq, Clone)]
pub struct Attributes(pub Vec<Attribute>);
impl Attributes {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    pub fn find_by_name(&self, name: &str, constant_pool: &ConstantPool) -> Option<&Attribute> {
        self.0.iter().find(|a| {
            constant_pool
                .utf8(a.attribute_name_index)
                .map_or(false, |s| s == name)
        })
    }

    pub fn is_deprecated(&self) -> bool {
        self.0
            .iter()
            .any(|a| matches!(a.info, AttributeInfo::Deprecated))
    }

    pub fn code_attribute(&self) -> Option<&CodeAttribute> {
        self.0.iter().find_map(|a| match &a.info {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        })
    }

    pub fn source_file(&self) -> Option<u16> {
        self.0.iter().find_map(|a| match a.info {
            AttributeInfo::SourceFile { sourcefile_index } => Some(sourcefile_index),
            _ => None,
        })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

#[derive(PartialEq, Clone)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Attributes,
}
impl fmt::Debug for CodeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeAttribute")
            .field("max_stack", &self.max_stack)
            .field("max_locals", &self.max_locals)
            .field("code", &format!("({} bytes)", self.code.len()))
            .field("exception_table", &self.exception_table)
            .field("attributes", &self.attributes)
            .finish()
    }
}

#[cfg(test)]
mod find_by_name_tests {
    use super::*;
    use crate::constant_pool::CpInfo;

    fn pool() -> ConstantPool {
        ConstantPool::new(vec![
            CpInfo::Utf8(DEPRECATED.into()),
            CpInfo::Utf8("RuntimeVisibleAnnotations".into()),
            CpInfo::Integer(3),
        ])
    }

    #[test]
    fn it_should_find_an_attribute_by_its_resolved_name() {
        let attributes = Attributes(vec![
            Attribute {
                attribute_name_index: 2,
                info: AttributeInfo::Opaque(vec![0, 0]),
            },
            Attribute {
                attribute_name_index: 1,
                info: AttributeInfo::Deprecated,
            },
        ]);

        let found = attributes.find_by_name(DEPRECATED, &pool()).unwrap();

        assert_eq!(found.info, AttributeInfo::Deprecated);
        assert!(attributes.is_deprecated());
        assert!(attributes.find_by_name(CODE, &pool()).is_none());
    }

    #[test]
    fn it_should_skip_attributes_with_unresolvable_names() {
        let attributes = Attributes(vec![Attribute {
            attribute_name_index: 3,
            info: AttributeInfo::Opaque(vec![]),
        }]);

        assert!(attributes.find_by_name("3", &pool()).is_none());
        assert!(!attributes.is_deprecated());
    }
}
