//! Class file writer.
//!
//! ```text
//! ClassFile
//! ├── header       magic, version, access, this/super, interfaces
//! ├── fields       FieldInfo ── RuntimeVisibleAnnotations
//! └── methods      MethodInfo ─┬─ Code ─┬─ StackMapTable
//!                              │        └─ LocalVariableTable
//!                              ├─ RuntimeVisibleAnnotations
//!                              └─ RuntimeVisibleParameterAnnotations
//! ```
//!
//! The constant pool is owned by the [`ClassFile`] and shared by every
//! method body assembled for it.

use crate::access::{ClassAccess, FieldAccess, MethodAccess};
use crate::annotation::{self, Annotation};
use crate::bytes::ByteWriter;
use crate::code::{AssembledCode, CodeBuilder, MethodShape};
use crate::constant::ConstantPool;
use crate::error::Result;

pub const MAGIC: u32 = 0xCAFE_BABE;

/// One `LocalVariableTable` entry covering the whole method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub name: String,
    pub descriptor: String,
    pub slot: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub access: FieldAccess,
    pub name: String,
    pub descriptor: String,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub access: MethodAccess,
    pub name: String,
    pub descriptor: String,
    /// Absent for abstract and native methods.
    pub code: Option<AssembledCode>,
    pub locals: Vec<LocalVariable>,
    pub annotations: Vec<Annotation>,
    /// One list per declared parameter; written only if any is non-empty.
    pub parameter_annotations: Vec<Vec<Annotation>>,
}

impl MethodInfo {
    pub fn new(
        access: MethodAccess,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            code: None,
            locals: Vec::new(),
            annotations: Vec::new(),
            parameter_annotations: Vec::new(),
        }
    }
}

/// A class being written.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub major: u16,
    pub minor: u16,
    pub access: ClassAccess,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub annotations: Vec<Annotation>,
    pool: ConstantPool,
}

impl ClassFile {
    pub fn new(major: u16, access: ClassAccess, name: impl Into<String>) -> Self {
        Self {
            major,
            minor: 0,
            access,
            name: name.into(),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            annotations: Vec::new(),
            pool: ConstantPool::new(),
        }
    }

    pub fn pool(&self) -> &ConstantPool {
        &self.pool
    }

    /// Whether method bodies need `StackMapTable` frames.
    pub fn uses_stack_maps(&self) -> bool {
        self.major >= 50
    }

    /// Assemble a method body against this class's constant pool.
    pub fn assemble(
        &mut self,
        code: CodeBuilder,
        name: &str,
        descriptor: &str,
        is_static: bool,
    ) -> Result<AssembledCode> {
        let stack_maps = self.uses_stack_maps();
        let shape = MethodShape {
            class_name: &self.name,
            name,
            descriptor,
            is_static,
        };
        code.assemble(&mut self.pool, &shape, stack_maps)
    }

    /// Serialize. The pool is finalized here, so this consumes the class.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn to_bytes(mut self) -> Result<Vec<u8>> {
        let mut body = ByteWriter::new();
        let pool = &mut self.pool;

        body.u2(self.access.bits());
        body.u2(pool.class(&self.name)?);
        match &self.super_name {
            Some(name) => body.u2(pool.class(name)?),
            None => body.u2(0),
        }
        body.u2(self.interfaces.len() as u16);
        for iface in &self.interfaces {
            body.u2(pool.class(iface)?);
        }

        body.u2(self.fields.len() as u16);
        for field in &self.fields {
            body.u2(field.access.bits());
            body.u2(pool.utf8(&field.name)?);
            body.u2(pool.utf8(&field.descriptor)?);
            let mut attributes = Vec::new();
            if !field.annotations.is_empty() {
                attributes.push((
                    "RuntimeVisibleAnnotations",
                    annotation::write_annotations(&field.annotations, pool)?,
                ));
            }
            write_attributes(&mut body, pool, &attributes)?;
        }

        body.u2(self.methods.len() as u16);
        for method in &self.methods {
            body.u2(method.access.bits());
            body.u2(pool.utf8(&method.name)?);
            body.u2(pool.utf8(&method.descriptor)?);
            let mut attributes = Vec::new();
            if let Some(code) = &method.code {
                attributes.push(("Code", write_code(code, &method.locals, pool)?));
            }
            if !method.annotations.is_empty() {
                attributes.push((
                    "RuntimeVisibleAnnotations",
                    annotation::write_annotations(&method.annotations, pool)?,
                ));
            }
            if method.parameter_annotations.iter().any(|a| !a.is_empty()) {
                attributes.push((
                    "RuntimeVisibleParameterAnnotations",
                    annotation::write_parameter_annotations(&method.parameter_annotations, pool)?,
                ));
            }
            write_attributes(&mut body, pool, &attributes)?;
        }

        let mut attributes = Vec::new();
        if !self.annotations.is_empty() {
            attributes.push((
                "RuntimeVisibleAnnotations",
                annotation::write_annotations(&self.annotations, pool)?,
            ));
        }
        write_attributes(&mut body, pool, &attributes)?;

        let mut out = ByteWriter::new();
        out.u4(MAGIC);
        out.u2(self.minor);
        out.u2(self.major);
        pool.write(&mut out);
        out.bytes(body.as_slice());
        Ok(out.into_bytes())
    }
}

fn write_attributes(
    out: &mut ByteWriter,
    pool: &mut ConstantPool,
    attributes: &[(&str, Vec<u8>)],
) -> Result<()> {
    out.u2(attributes.len() as u16);
    for (name, data) in attributes {
        out.u2(pool.utf8(name)?);
        out.u4(data.len() as u32);
        out.bytes(data);
    }
    Ok(())
}

fn write_code(
    code: &AssembledCode,
    locals: &[LocalVariable],
    pool: &mut ConstantPool,
) -> Result<Vec<u8>> {
    let mut out = ByteWriter::new();
    out.u2(code.max_stack);
    out.u2(code.max_locals);
    out.u4(code.code.len() as u32);
    out.bytes(&code.code);
    // exception_table_length
    out.u2(0);

    let mut attributes = Vec::new();
    if code.frame_count > 0 {
        let mut table = ByteWriter::new();
        table.u2(code.frame_count);
        table.bytes(&code.stack_map);
        attributes.push(("StackMapTable", table.into_bytes()));
    }
    if !locals.is_empty() {
        let mut table = ByteWriter::new();
        table.u2(locals.len() as u16);
        for local in locals {
            table.u2(0);
            table.u2(code.code.len() as u16);
            table.u2(pool.utf8(&local.name)?);
            table.u2(pool.utf8(&local.descriptor)?);
            table.u2(local.slot);
        }
        attributes.push(("LocalVariableTable", table.into_bytes()));
    }
    write_attributes(&mut out, pool, &attributes)?;
    Ok(out.into_bytes())
}
