use std::fmt;

use bitflags::bitflags;

bitflags! {
    pub struct ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

bitflags! {
    pub struct FieldAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

bitflags! {
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

// Flags must be listed in ascending bit order.
macro_rules! impl_display_flags {
    ($flags:ty, [$($flag:ident),* $(,)?]) => {
        impl fmt::Display for $flags {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let names = [$((Self::$flag, concat!("ACC_", stringify!($flag)))),*];
                let mut first = true;
                for (flag, name) in names {
                    if !self.contains(flag) {
                        continue;
                    }
                    if !first {
                        f.write_str(", ")?;
                    }
                    f.write_str(name)?;
                    first = false;
                }

                Ok(())
            }
        }
    };
}

impl_display_flags!(
    ClassAccessFlags,
    [PUBLIC, FINAL, SUPER, INTERFACE, ABSTRACT, SYNTHETIC, ANNOTATION, ENUM, MODULE]
);
impl_display_flags!(
    FieldAccessFlags,
    [PUBLIC, PRIVATE, PROTECTED, STATIC, FINAL, VOLATILE, TRANSIENT, SYNTHETIC, ENUM]
);
impl_display_flags!(
    MethodAccessFlags,
    [
        PUBLIC,
        PRIVATE,
        PROTECTED,
        STATIC,
        FINAL,
        SYNCHRONIZED,
        BRIDGE,
        VARARGS,
        NATIVE,
        ABSTRACT,
        STRICT,
        SYNTHETIC,
    ]
);
