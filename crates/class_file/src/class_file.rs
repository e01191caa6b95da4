use crate::{
    attributes::Attributes, parser::Parser, ClassAccessFlags, ConstantPool, FieldAccessFlags,
    MethodAccessFlags, Result,
};

pub const MAGIC: u32 = 0xCAFEBABE;

/// Name and descriptor of the method a launcher starts a program from.
pub const MAIN_METHOD: (&str, &str) = ("main", "([Ljava/lang/String;)V");

#[derive(Debug)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Attributes,
}
impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<ClassFile> {
        Parser::new(bytes).parse()
    }

    pub fn class_access_flags(&self) -> ClassAccessFlags {
        ClassAccessFlags::from_bits_truncate(self.access_flags)
    }

    /// Resolves any constant pool index to its text, see [`ConstantPool::text`].
    pub fn resolve(&self, index: u16) -> Result<&str> {
        self.constant_pool.text(index)
    }

    pub fn class_name(&self) -> Result<&str> {
        // The constant_pool entry at this_class must be a CONSTANT_Class_info structure
        // representing the class or interface defined by this class file.
        self.constant_pool.class_name(self.this_class)
    }

    pub fn super_class(&self) -> Result<Option<&str>> {
        // If the value of the super_class item is zero, then this class file must represent
        // the class Object, the only class or interface without a direct superclass.
        if self.super_class == 0 {
            return Ok(None);
        }

        self.constant_pool.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> Result<Vec<&str>> {
        self.interfaces
            .iter()
            .map(|&index| self.constant_pool.class_name(index))
            .collect()
    }

    pub fn field_name(&self, field: &FieldInfo) -> Result<&str> {
        self.constant_pool.utf8(field.name_index)
    }

    pub fn field_descriptor(&self, field: &FieldInfo) -> Result<&str> {
        self.constant_pool.utf8(field.descriptor_index)
    }

    pub fn method_name(&self, method: &MethodInfo) -> Result<&str> {
        self.constant_pool.utf8(method.name_index)
    }

    pub fn method_descriptor(&self, method: &MethodInfo) -> Result<&str> {
        self.constant_pool.utf8(method.descriptor_index)
    }

    /// Finds `public static void main(String[])`, if the class declares one.
    pub fn main_method(&self) -> Result<Option<&MethodInfo>> {
        let (name, descriptor) = MAIN_METHOD;
        for method in &self.methods {
            if self.method_name(method)? == name && self.method_descriptor(method)? == descriptor {
                return Ok(Some(method));
            }
        }

        Ok(None)
    }

    pub fn is_deprecated(&self) -> bool {
        self.attributes.is_deprecated()
    }

    pub fn source_file(&self) -> Result<Option<&str>> {
        self.attributes
            .source_file()
            .map(|index| self.constant_pool.utf8(index))
            .transpose()
    }
}

/// Shared layout of `field_info` and `method_info`.
#[derive(Debug, PartialEq, Clone)]
pub struct MemberInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
}
impl MemberInfo {
    pub fn field_access_flags(&self) -> FieldAccessFlags {
        FieldAccessFlags::from_bits_truncate(self.access_flags)
    }

    pub fn method_access_flags(&self) -> MethodAccessFlags {
        MethodAccessFlags::from_bits_truncate(self.access_flags)
    }
}

pub type FieldInfo = MemberInfo;
pub type MethodInfo = MemberInfo;
