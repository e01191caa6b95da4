use log::{debug, trace};

use crate::{
    attributes::{self, Attribute, AttributeInfo, Attributes, CodeAttribute, ExceptionTableEntry},
    class_file::{MemberInfo, MAGIC},
    constant_pool::{
        ClassInfo, CpInfo, DynamicInfo, MethodHandleInfo, MethodTypeInfo, NameAndTypeInfo, RefInfo,
    },
    ByteCursor, ClassFile, ClassFileError, ConstantPool, Result,
};

pub struct Parser<'a> {
    r: ByteCursor<'a>,
}
impl<'a> Parser<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            r: ByteCursor::new(buf),
        }
    }

    pub fn parse(&mut self) -> Result<ClassFile> {
        let magic = self.parse_magic_identifier()?;
        let minor_version = self.read_u16()?;
        let major_version = self.read_u16()?;
        debug!("class file version {major_version}.{minor_version}");

        let constant_pool = self.parse_constant_pool()?;
        let access_flags = self.read_u16()?;
        let this_class = self.read_u16()?;
        let super_class = self.read_u16()?;

        let interfaces_count = self.read_u16()?;
        let interfaces = self.r.read_u16_vec(interfaces_count)?;

        let fields_count = self.read_u16()?;
        debug!("parsing {fields_count} fields");
        let fields = (0..fields_count)
            .map(|_| self.parse_member_info(&constant_pool))
            .collect::<Result<Vec<_>>>()?;

        let methods_count = self.read_u16()?;
        debug!("parsing {methods_count} methods");
        let methods = (0..methods_count)
            .map(|_| self.parse_member_info(&constant_pool))
            .collect::<Result<Vec<_>>>()?;

        let attributes_count = self.read_u16()?;
        let attributes = self.parse_attributes(attributes_count, &constant_pool)?;

        if self.r.remaining() > 0 {
            debug!("{} trailing bytes after class file", self.r.remaining());
        }

        Ok(ClassFile {
            magic,
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    fn parse_member_info(&mut self, constant_pool: &ConstantPool) -> Result<MemberInfo> {
        let access_flags = self.read_u16()?;
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;
        let attributes_count = self.read_u16()?;
        let attributes = self.parse_attributes(attributes_count, constant_pool)?;

        Ok(MemberInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn parse_magic_identifier(&mut self) -> Result<u32> {
        match self.read_u32()? {
            MAGIC => Ok(MAGIC),
            magic_identifier => Err(ClassFileError::BadMagic(magic_identifier)),
        }
    }

    pub fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let constant_pool_count = self.read_u16()? as u32;
        debug!("constant pool count {constant_pool_count}");

        let mut res = Vec::with_capacity(constant_pool_count.saturating_sub(1) as usize);
        let mut index = 1;
        while index < constant_pool_count {
            let cp_info = self.parse_cp_info(index as u16)?;
            trace!("#{index} = {cp_info:?}");

            let wide = cp_info.is_wide();
            res.push(cp_info);
            if wide {
                // The slot after a Long or Double exists but is never valid.
                if index + 1 < constant_pool_count {
                    res.push(CpInfo::Unusable);
                }
                index += 2;
            } else {
                index += 1;
            }
        }

        Ok(ConstantPool::new(res))
    }

    fn parse_cp_info(&mut self, index: u16) -> Result<CpInfo> {
        let tag = self.read_u8()?;
        let cp_info = match tag {
            1 => self.parse_utf8(index)?,
            3 => CpInfo::Integer(self.r.read_i32()?),
            4 => CpInfo::Float(f32::from_bits(self.read_u32()?)),
            5 => CpInfo::Long(self.r.read_i64()?),
            6 => CpInfo::Double(f64::from_bits(self.r.read_u64()?)),
            7 => CpInfo::Class(ClassInfo {
                name_index: self.read_u16()?,
            }),
            8 => CpInfo::String {
                string_index: self.read_u16()?,
            },
            9 => CpInfo::FieldRef(self.parse_ref_info()?),
            10 => CpInfo::MethodRef(self.parse_ref_info()?),
            11 => CpInfo::InterfaceMethodRef(self.parse_ref_info()?),
            12 => self.parse_name_and_type_info()?,
            15 => self.parse_method_handle()?,
            16 => CpInfo::MethodType(MethodTypeInfo {
                descriptor_index: self.read_u16()?,
            }),
            17 => CpInfo::Dynamic(self.parse_dynamic_info()?),
            18 => CpInfo::InvokeDynamic(self.parse_dynamic_info()?),
            19 => CpInfo::Module {
                name_index: self.read_u16()?,
            },
            20 => CpInfo::Package {
                name_index: self.read_u16()?,
            },
            _ => return Err(ClassFileError::UnknownConstantTag { tag, index }),
        };

        Ok(cp_info)
    }

    // Class files encode text as modified UTF-8: NUL is `C0 80` and supplementary
    // characters are surrogate pairs.
    fn parse_utf8(&mut self, index: u16) -> Result<CpInfo> {
        let length = self.read_u16()?;
        let bytes = self.r.read_bytes(length as usize)?;
        let s = cesu8::from_java_cesu8(bytes)
            .map_err(|source| ClassFileError::InvalidUtf8 { index, source })?;

        Ok(CpInfo::Utf8(s.into_owned()))
    }

    fn parse_name_and_type_info(&mut self) -> Result<CpInfo> {
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;

        Ok(CpInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    fn parse_method_handle(&mut self) -> Result<CpInfo> {
        let reference_kind = self.read_u8()?;
        let reference_index = self.read_u16()?;

        Ok(CpInfo::MethodHandle(MethodHandleInfo {
            reference_kind,
            reference_index,
        }))
    }

    fn parse_dynamic_info(&mut self) -> Result<DynamicInfo> {
        let bootstrap_method_attr_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(DynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        })
    }

    fn parse_ref_info(&mut self) -> Result<RefInfo> {
        let class_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(RefInfo {
            class_index,
            name_and_type_index,
        })
    }

    pub fn parse_attributes(
        &mut self,
        attributes_count: u16,
        constant_pool: &ConstantPool,
    ) -> Result<Attributes> {
        (0..attributes_count)
            .map(|_| self.parse_attribute(constant_pool))
            .collect::<Result<Vec<_>>>()
            .map(Attributes)
    }

    fn parse_attribute(&mut self, constant_pool: &ConstantPool) -> Result<Attribute> {
        let attribute_name_index = self.read_u16()?;
        let attribute_length = self.read_u32()?;
        let name = constant_pool.utf8(attribute_name_index)?;

        let start = self.r.position();
        let info = match name {
            attributes::DEPRECATED => AttributeInfo::Deprecated,
            attributes::SYNTHETIC => AttributeInfo::Synthetic,
            attributes::SOURCE_FILE => AttributeInfo::SourceFile {
                sourcefile_index: self.read_u16()?,
            },
            attributes::CONSTANT_VALUE => AttributeInfo::ConstantValue {
                constantvalue_index: self.read_u16()?,
            },
            attributes::SIGNATURE => AttributeInfo::Signature {
                signature_index: self.read_u16()?,
            },
            attributes::CODE => AttributeInfo::Code(self.parse_code_attribute(constant_pool)?),
            _ => AttributeInfo::Opaque(self.r.read_bytes(attribute_length as usize)?.to_vec()),
        };

        let consumed = self.r.position() - start;
        if consumed != attribute_length as usize {
            return Err(ClassFileError::AttributeLengthMismatch {
                name: name.to_owned(),
                declared: attribute_length,
                consumed,
            });
        }
        trace!("attribute {name} ({attribute_length} bytes)");

        Ok(Attribute {
            attribute_name_index,
            info,
        })
    }

    fn parse_code_attribute(&mut self, constant_pool: &ConstantPool) -> Result<CodeAttribute> {
        let max_stack = self.read_u16()?;
        let max_locals = self.read_u16()?;
        let code_length = self.read_u32()?;
        let code = self.r.read_bytes(code_length as usize)?.to_vec();
        let exception_table_length = self.read_u16()?;
        let exception_table = (0..exception_table_length)
            .map(|_| self.parse_exception_table_entry())
            .collect::<Result<Vec<_>>>()?;
        let attributes_count = self.read_u16()?;
        let attributes = self.parse_attributes(attributes_count, constant_pool)?;

        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    fn parse_exception_table_entry(&mut self) -> Result<ExceptionTableEntry> {
        let start_pc = self.read_u16()?;
        let end_pc = self.read_u16()?;
        let handler_pc = self.read_u16()?;
        let catch_type = self.read_u16()?;

        Ok(ExceptionTableEntry {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        })
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.r.read_u32()
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.r.read_u16()
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.r.read_u8()
    }
}

#[cfg(test)]
fn utf8_entry(s: &str) -> Vec<u8> {
    let mut bytes = vec![1];
    bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
    bytes.extend_from_slice(s.as_bytes());
    bytes
}



#[cfg(test)]
mod parse_attributes_tests {
    use super::*;

    fn pool() -> ConstantPool {
        ConstantPool::new(vec![
            CpInfo::Utf8("Deprecated".into()),
            CpInfo::Utf8("SourceFile".into()),
            CpInfo::Utf8("Custom".into()),
            CpInfo::Integer(0),
            CpInfo::Utf8("Code".into()),
            CpInfo::Utf8("LineNumberTable".into()),
            CpInfo::Utf8("Synthetic".into()),
            CpInfo::Utf8("Signature".into()),
        ])
    }

    #[test]
    fn it_should_parse_a_synthetic_attribute() {
        let bytes = [0x00, 0x07, 0x00, 0x00, 0x00, 0x00];

        let attributes = Parser::new(&bytes).parse_attributes(1, &pool()).unwrap();

        assert_eq!(attributes.0[0].info, AttributeInfo::Synthetic);
    }

    #[test]
    fn it_should_fail_if_a_synthetic_attribute_declares_a_payload() {
        let bytes = [0x00, 0x07, 0x00, 0x00, 0x00, 0x01, 0x00];

        assert!(matches!(
            Parser::new(&bytes).parse_attributes(1, &pool()),
            Err(ClassFileError::AttributeLengthMismatch {
                declared: 1,
                consumed: 0,
                ..
            })
        ));
    }

    #[test]
    fn it_should_parse_a_signature_attribute() {
        let bytes = [0x00, 0x08, 0x00, 0x00, 0x00, 0x02, 0x00, 0x03];

        let attributes = Parser::new(&bytes).parse_attributes(1, &pool()).unwrap();

        assert_eq!(
            attributes.0[0].info,
            AttributeInfo::Signature { signature_index: 3 }
        );
    }

    #[test]
    fn it_should_fail_if_a_signature_attribute_overstates_its_length() {
        let bytes = [0x00, 0x08, 0x00, 0x00, 0x00, 0x04, 0x00, 0x03, 0x00, 0x00];

        assert!(matches!(
            Parser::new(&bytes).parse_attributes(1, &pool()),
            Err(ClassFileError::AttributeLengthMismatch {
                declared: 4,
                consumed: 2,
                ..
            })
        ));
    }

    #[test]
    fn it_should_parse_a_deprecated_attribute() {
        let bytes = [0x00, 0x01, 0x00, 0x00, 0x00, 0x00];

        let attributes = Parser::new(&bytes).parse_attributes(1, &pool()).unwrap();

        assert_eq!(
            attributes.0,
            vec![Attribute {
                attribute_name_index: 1,
                info: AttributeInfo::Deprecated
            }]
        );
    }

    #[test]
    fn it_should_keep_unknown_attributes_verbatim() {
        let bytes = [0x00, 0x03, 0x00, 0x00, 0x00, 0x03, 0xde, 0xad, 0xbe, 0xef];
        let mut parser = Parser::new(&bytes);

        let attributes = parser.parse_attributes(1, &pool()).unwrap();

        assert_eq!(
            attributes.0[0].info,
            AttributeInfo::Opaque(vec![0xde, 0xad, 0xbe])
        );
        assert_eq!(parser.r.remaining(), 1);
    }

    #[test]
    fn it_should_fail_if_an_empty_attribute_declares_a_payload() {
        let bytes = [0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00];

        assert!(matches!(
            Parser::new(&bytes).parse_attributes(1, &pool()),
            Err(ClassFileError::AttributeLengthMismatch {
                declared: 2,
                consumed: 0,
                ..
            })
        ));
    }

    #[test]
    fn it_should_fail_if_the_declared_length_is_too_short() {
        let bytes = [0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x07];

        assert!(matches!(
            Parser::new(&bytes).parse_attributes(1, &pool()),
            Err(ClassFileError::AttributeLengthMismatch {
                declared: 1,
                consumed: 2,
                ..
            })
        ));
    }

    #[test]
    fn it_should_fail_if_the_name_is_not_utf8() {
        let bytes = [0x00, 0x04, 0x00, 0x00, 0x00, 0x00];

        assert!(matches!(
            Parser::new(&bytes).parse_attributes(1, &pool()),
            Err(ClassFileError::WrongConstantKind { index: 4, .. })
        ));
    }

    #[test]
    fn it_should_fail_if_the_name_index_is_out_of_range() {
        let bytes = [0x00, 0x09, 0x00, 0x00, 0x00, 0x00];

        assert!(matches!(
            Parser::new(&bytes).parse_attributes(1, &pool()),
            Err(ClassFileError::InvalidPoolIndex(9))
        ));
    }

    #[test]
    fn it_should_parse_a_code_attribute_with_nested_attributes() {
        #[rustfmt::skip]
        let bytes = [
            0x00, 0x05, 0x00, 0x00, 0x00, 0x23,
            0x00, 0x02, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x03, 0x2a, 0xb7, 0xb1,
            0x00, 0x01,
            0x00, 0x00, 0x00, 0x03, 0x00, 0x03, 0x00, 0x00,
            0x00, 0x01,
            0x00, 0x06, 0x00, 0x00, 0x00, 0x06, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01,
        ];

        let attributes = Parser::new(&bytes).parse_attributes(1, &pool()).unwrap();
        let code = attributes.code_attribute().unwrap();

        assert_eq!(code.max_stack, 2);
        assert_eq!(code.max_locals, 1);
        assert_eq!(code.code, vec![0x2a, 0xb7, 0xb1]);
        assert_eq!(
            code.exception_table,
            vec![ExceptionTableEntry {
                start_pc: 0,
                end_pc: 3,
                handler_pc: 3,
                catch_type: 0
            }]
        );
        assert_eq!(
            code.attributes.0[0].info,
            AttributeInfo::Opaque(vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x01])
        );
    }
}
