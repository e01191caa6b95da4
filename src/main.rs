use std::{env, error::Error, fs::File};

use classview_class_file::{Attributes, ClassFile, MemberInfo, Result};
use memmap::Mmap;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    let path = env::args().nth(1).ok_or("usage: classview <path to .class file>")?;
    let file = File::open(&path)?;
    let mmap = unsafe { Mmap::map(&file)? };

    log::debug!("decoding {} ({} bytes)", path, mmap.len());
    let class_file = ClassFile::parse(&mmap)?;

    print_class(&class_file)?;
    Ok(())
}

fn print_class(class_file: &ClassFile) -> Result<()> {
    println!("magic: {:x}", class_file.magic);
    println!("minor version: {}", class_file.minor_version);
    println!("major version: {}", class_file.major_version);
    println!("constant pool count: {}", class_file.constant_pool.count());
    println!("access flags: {}", class_file.class_access_flags());
    println!("this class: {}", class_file.class_name()?);
    println!(
        "super class: {}",
        class_file.super_class()?.unwrap_or_default()
    );
    println!("interfaces: {}", class_file.interface_names()?.join(", "));
    if let Some(source_file) = class_file.source_file()? {
        println!("source file: {}", source_file);
    }
    print_attributes(class_file, &class_file.attributes)?;

    println!("fields count: {}", class_file.fields.len());
    for field in &class_file.fields {
        println!();
        println!("field name: {}", class_file.field_name(field)?);
        println!("access flags: {}", field.field_access_flags());
        println!("descriptor: {}", class_file.field_descriptor(field)?);
        print_attributes(class_file, &field.attributes)?;
    }
    println!();

    println!("methods count: {}", class_file.methods.len());
    for method in &class_file.methods {
        println!();
        print_method(class_file, method)?;
    }

    if let Some(main) = class_file.main_method()? {
        println!();
        println!(
            "entry point: {}{}",
            class_file.method_name(main)?,
            class_file.method_descriptor(main)?
        );
    }

    Ok(())
}

fn print_method(class_file: &ClassFile, method: &MemberInfo) -> Result<()> {
    println!("method name: {}", class_file.method_name(method)?);
    println!("access flags: {}", method.method_access_flags());
    println!("descriptor: {}", class_file.method_descriptor(method)?);
    if let Some(code) = method.attributes.code_attribute() {
        println!(
            "code: stack={}, locals={}, {} bytes",
            code.max_stack,
            code.max_locals,
            code.code.len()
        );
    }
    print_attributes(class_file, &method.attributes)
}

fn print_attributes(class_file: &ClassFile, attributes: &Attributes) -> Result<()> {
    if attributes.is_empty() {
        return Ok(());
    }

    let names = attributes
        .iter()
        .map(|a| class_file.constant_pool.utf8(a.attribute_name_index))
        .collect::<Result<Vec<_>>>()?;
    println!("attributes: {}", names.join(", "));

    Ok(())
}
