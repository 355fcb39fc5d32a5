//! Class file reader and host introspection.
//!
//! [`ClassReader`] parses the structural parts of a class file. Method
//! bytecode is kept as raw bytes; only the compiler's test interpreter and
//! diagnostics look inside it.

use sylect_core::{
    ClassMeta, FieldMeta, MethodMeta, ParameterMeta, TypeMeta, names, parse_method_descriptor,
};

use crate::access::{ClassAccess, FieldAccess, MethodAccess};
use crate::annotation::{self, Annotation};
use crate::bytes::ByteReader;
use crate::constant::ConstantPool;
use crate::error::{ClassFileError, Result};
use crate::writer::MAGIC;

/// An attribute whose body was not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: String,
    pub data: Vec<u8>,
}

fn find<'a>(attributes: &'a [RawAttribute], name: &str) -> Option<&'a RawAttribute> {
    attributes.iter().find(|a| a.name == name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedField {
    pub access: FieldAccess,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<RawAttribute>,
}

/// Decoded `Code` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCode {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub attributes: Vec<RawAttribute>,
}

/// A decoded `LocalVariableTable` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariableEntry {
    pub start: u16,
    pub length: u16,
    pub name: String,
    pub descriptor: String,
    pub slot: u16,
}

impl ParsedCode {
    /// Number of `StackMapTable` entries, 0 when the attribute is absent.
    pub fn stack_map_frames(&self) -> u16 {
        find(&self.attributes, "StackMapTable")
            .and_then(|a| a.data.get(..2))
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .unwrap_or(0)
    }

    pub fn local_variables(&self, pool: &ConstantPool) -> Result<Vec<LocalVariableEntry>> {
        let Some(table) = find(&self.attributes, "LocalVariableTable") else {
            return Ok(Vec::new());
        };
        let mut input = ByteReader::new(&table.data);
        let count = input.u2()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(LocalVariableEntry {
                start: input.u2()?,
                length: input.u2()?,
                name: pool.utf8_at(input.u2()?)?.to_string(),
                descriptor: pool.utf8_at(input.u2()?)?.to_string(),
                slot: input.u2()?,
            });
        }
        Ok(entries)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMethod {
    pub access: MethodAccess,
    pub name: String,
    pub descriptor: String,
    pub code: Option<ParsedCode>,
    pub attributes: Vec<RawAttribute>,
}

/// A parsed class file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedClass {
    pub minor: u16,
    pub major: u16,
    pub pool: ConstantPool,
    pub access: ClassAccess,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<ParsedField>,
    pub methods: Vec<ParsedMethod>,
    pub attributes: Vec<RawAttribute>,
}

impl ParsedClass {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        ClassReader::new(bytes).read()
    }

    pub fn field(&self, name: &str) -> Option<&ParsedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&ParsedMethod> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// `RuntimeVisibleAnnotations` from a class, field, or method attribute list.
    pub fn annotations(&self, attributes: &[RawAttribute]) -> Result<Vec<Annotation>> {
        match find(attributes, "RuntimeVisibleAnnotations") {
            Some(attr) => annotation::read_annotations(&self.pool, &attr.data),
            None => Ok(Vec::new()),
        }
    }

    pub fn parameter_annotations(&self, method: &ParsedMethod) -> Result<Vec<Vec<Annotation>>> {
        match find(&method.attributes, "RuntimeVisibleParameterAnnotations") {
            Some(attr) => annotation::read_parameter_annotations(&self.pool, &attr.data),
            None => Ok(Vec::new()),
        }
    }

    /// Structural metadata for the resolver.
    ///
    /// Members whose types fall outside the language's type model (multi-
    /// dimensional arrays) are left out, as are static initializers.
    pub fn to_class_meta(&self) -> ClassMeta {
        let mut meta = ClassMeta::new(self.name.clone());
        meta.is_interface = self.access.contains(ClassAccess::INTERFACE);
        meta.base_class_name = self.super_name.clone();
        meta.interfaces = self.interfaces.clone();

        for field in &self.fields {
            let Some(ty) = TypeMeta::from_descriptor(&field.descriptor) else {
                continue;
            };
            meta.fields.push(FieldMeta::new(
                field.name.clone(),
                field.access.contains(FieldAccess::STATIC),
                ty,
            ));
        }

        for method in &self.methods {
            if method.name == "<clinit>" {
                continue;
            }
            let Some((params, return_type)) = parse_method_descriptor(&method.descriptor) else {
                continue;
            };
            let parameters = params
                .into_iter()
                .enumerate()
                .map(|(i, ty)| ParameterMeta::new(format!("arg{i}"), ty))
                .collect();
            meta.methods.push(MethodMeta::new(
                method.name.clone(),
                method.access.contains(MethodAccess::STATIC),
                method.access.contains(MethodAccess::NATIVE),
                method.access.contains(MethodAccess::ABSTRACT),
                return_type,
                parameters,
            ));
        }

        if meta.name == names::OBJECT {
            meta.base_class_name = None;
        }
        meta
    }
}

/// Sequential class file parser.
pub struct ClassReader<'a> {
    input: ByteReader<'a>,
}

impl<'a> ClassReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            input: ByteReader::new(bytes),
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn read(mut self) -> Result<ParsedClass> {
        let magic = self.input.u4()?;
        if magic != MAGIC {
            return Err(ClassFileError::malformed(format!("bad magic {magic:#010x}")));
        }
        let minor = self.input.u2()?;
        let major = self.input.u2()?;
        let pool = ConstantPool::read(&mut self.input)?;

        let access = ClassAccess::from_bits_retain(self.input.u2()?);
        let name = pool.class_name_at(self.input.u2()?)?.to_string();
        let super_index = self.input.u2()?;
        let super_name = if super_index == 0 {
            None
        } else {
            Some(pool.class_name_at(super_index)?.to_string())
        };

        let count = self.input.u2()?;
        let mut interfaces = Vec::with_capacity(count as usize);
        for _ in 0..count {
            interfaces.push(pool.class_name_at(self.input.u2()?)?.to_string());
        }

        let count = self.input.u2()?;
        let mut fields = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let access = FieldAccess::from_bits_retain(self.input.u2()?);
            let name = pool.utf8_at(self.input.u2()?)?.to_string();
            let descriptor = pool.utf8_at(self.input.u2()?)?.to_string();
            let attributes = self.attributes(&pool)?;
            fields.push(ParsedField {
                access,
                name,
                descriptor,
                attributes,
            });
        }

        let count = self.input.u2()?;
        let mut methods = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let access = MethodAccess::from_bits_retain(self.input.u2()?);
            let name = pool.utf8_at(self.input.u2()?)?.to_string();
            let descriptor = pool.utf8_at(self.input.u2()?)?.to_string();
            let mut attributes = self.attributes(&pool)?;
            let code = match attributes.iter().position(|a| a.name == "Code") {
                Some(at) => Some(parse_code(&pool, &attributes.remove(at).data)?),
                None => None,
            };
            methods.push(ParsedMethod {
                access,
                name,
                descriptor,
                code,
                attributes,
            });
        }

        let attributes = self.attributes(&pool)?;
        tracing::trace!(class = %name, major, "parsed class file");

        Ok(ParsedClass {
            minor,
            major,
            pool,
            access,
            name,
            super_name,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    fn attributes(&mut self, pool: &ConstantPool) -> Result<Vec<RawAttribute>> {
        read_attributes(&mut self.input, pool)
    }
}

fn read_attributes(input: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Vec<RawAttribute>> {
    let count = input.u2()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = pool.utf8_at(input.u2()?)?.to_string();
        let len = input.u4()? as usize;
        let data = input.take(len)?.to_vec();
        attributes.push(RawAttribute { name, data });
    }
    Ok(attributes)
}

fn parse_code(pool: &ConstantPool, data: &[u8]) -> Result<ParsedCode> {
    let mut input = ByteReader::new(data);
    let max_stack = input.u2()?;
    let max_locals = input.u2()?;
    let len = input.u4()? as usize;
    let code = input.take(len)?.to_vec();
    let handlers = input.u2()? as usize;
    input.take(handlers * 8)?;
    let attributes = read_attributes(&mut input, pool)?;
    Ok(ParsedCode {
        max_stack,
        max_locals,
        code,
        attributes,
    })
}
