//! Runtime-visible annotation structures.

use crate::bytes::{ByteReader, ByteWriter};
use crate::constant::{Constant, ConstantPool};
use crate::error::{ClassFileError, Result};

/// One `annotation` structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation interface (`Ljava/lang/Deprecated;`).
    pub type_descriptor: String,
    pub elements: Vec<(String, ElementValue)>,
}

impl Annotation {
    pub fn new(type_descriptor: impl Into<String>) -> Self {
        Self {
            type_descriptor: type_descriptor.into(),
            elements: Vec::new(),
        }
    }

    pub fn element(mut self, name: impl Into<String>, value: ElementValue) -> Self {
        self.elements.push((name.into(), value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ElementValue> {
        self.elements
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub(crate) fn write(&self, pool: &mut ConstantPool, out: &mut ByteWriter) -> Result<()> {
        out.u2(pool.utf8(&self.type_descriptor)?);
        out.u2(self.elements.len() as u16);
        for (name, value) in &self.elements {
            out.u2(pool.utf8(name)?);
            value.write(pool, out)?;
        }
        Ok(())
    }

    pub(crate) fn read(pool: &ConstantPool, input: &mut ByteReader<'_>) -> Result<Self> {
        let type_descriptor = pool.utf8_at(input.u2()?)?.to_string();
        let count = input.u2()?;
        let mut elements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = pool.utf8_at(input.u2()?)?.to_string();
            elements.push((name, ElementValue::read(pool, input)?));
        }
        Ok(Self {
            type_descriptor,
            elements,
        })
    }
}

/// An `element_value`.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Host-only scalar constants (`B C S Z`), as read from compiled classes.
    OtherScalar { tag: u8, value: i32 },
    String(String),
    /// Return descriptor of the class (`Ljava/lang/String;`, `V`).
    Class(String),
    Enum { type_descriptor: String, name: String },
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    fn write(&self, pool: &mut ConstantPool, out: &mut ByteWriter) -> Result<()> {
        match self {
            Self::Int(v) => {
                out.u1(b'I');
                out.u2(pool.integer(*v)?);
            }
            Self::Long(v) => {
                out.u1(b'J');
                out.u2(pool.long(*v)?);
            }
            Self::Float(v) => {
                out.u1(b'F');
                out.u2(pool.float(*v)?);
            }
            Self::Double(v) => {
                out.u1(b'D');
                out.u2(pool.double(*v)?);
            }
            Self::OtherScalar { tag, value } => {
                out.u1(*tag);
                out.u2(pool.integer(*value)?);
            }
            Self::String(s) => {
                out.u1(b's');
                out.u2(pool.utf8(s)?);
            }
            Self::Class(descriptor) => {
                out.u1(b'c');
                out.u2(pool.utf8(descriptor)?);
            }
            Self::Enum {
                type_descriptor,
                name,
            } => {
                out.u1(b'e');
                out.u2(pool.utf8(type_descriptor)?);
                out.u2(pool.utf8(name)?);
            }
            Self::Annotation(annotation) => {
                out.u1(b'@');
                annotation.write(pool, out)?;
            }
            Self::Array(values) => {
                out.u1(b'[');
                out.u2(values.len() as u16);
                for value in values {
                    value.write(pool, out)?;
                }
            }
        }
        Ok(())
    }

    fn read(pool: &ConstantPool, input: &mut ByteReader<'_>) -> Result<Self> {
        let tag = input.u1()?;
        let value = match tag {
            b'I' | b'B' | b'C' | b'S' | b'Z' => {
                let index = input.u2()?;
                let Some(Constant::Integer(v)) = pool.get(index) else {
                    return Err(ClassFileError::malformed(format!(
                        "element value #{index} is not an Integer"
                    )));
                };
                if tag == b'I' {
                    Self::Int(*v)
                } else {
                    Self::OtherScalar { tag, value: *v }
                }
            }
            b'J' | b'F' | b'D' => {
                let index = input.u2()?;
                match (tag, pool.get(index)) {
                    (b'J', Some(Constant::Long(v))) => Self::Long(*v),
                    (b'F', Some(Constant::Float(v))) => Self::Float(*v),
                    (b'D', Some(Constant::Double(v))) => Self::Double(*v),
                    _ => {
                        return Err(ClassFileError::malformed(format!(
                            "element value #{index} does not match tag '{}'",
                            tag as char
                        )));
                    }
                }
            }
            b's' => Self::String(pool.utf8_at(input.u2()?)?.to_string()),
            b'c' => Self::Class(pool.utf8_at(input.u2()?)?.to_string()),
            b'e' => Self::Enum {
                type_descriptor: pool.utf8_at(input.u2()?)?.to_string(),
                name: pool.utf8_at(input.u2()?)?.to_string(),
            },
            b'@' => Self::Annotation(Annotation::read(pool, input)?),
            b'[' => {
                let count = input.u2()?;
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(Self::read(pool, input)?);
                }
                Self::Array(values)
            }
            other => {
                return Err(ClassFileError::malformed(format!(
                    "unknown element value tag '{}'",
                    other as char
                )));
            }
        };
        Ok(value)
    }
}

/// Body of a `RuntimeVisibleAnnotations` attribute.
pub(crate) fn write_annotations(
    annotations: &[Annotation],
    pool: &mut ConstantPool,
) -> Result<Vec<u8>> {
    let mut out = ByteWriter::new();
    out.u2(annotations.len() as u16);
    for annotation in annotations {
        annotation.write(pool, &mut out)?;
    }
    Ok(out.into_bytes())
}

/// Body of a `RuntimeVisibleParameterAnnotations` attribute.
pub(crate) fn write_parameter_annotations(
    parameters: &[Vec<Annotation>],
    pool: &mut ConstantPool,
) -> Result<Vec<u8>> {
    let mut out = ByteWriter::new();
    out.u1(parameters.len() as u8);
    for annotations in parameters {
        out.u2(annotations.len() as u16);
        for annotation in annotations {
            annotation.write(pool, &mut out)?;
        }
    }
    Ok(out.into_bytes())
}

pub(crate) fn read_annotations(pool: &ConstantPool, data: &[u8]) -> Result<Vec<Annotation>> {
    let mut input = ByteReader::new(data);
    let count = input.u2()?;
    (0..count).map(|_| Annotation::read(pool, &mut input)).collect()
}

pub(crate) fn read_parameter_annotations(
    pool: &ConstantPool,
    data: &[u8],
) -> Result<Vec<Vec<Annotation>>> {
    let mut input = ByteReader::new(data);
    let params = input.u1()?;
    let mut out = Vec::with_capacity(params as usize);
    for _ in 0..params {
        let count = input.u2()?;
        let annotations = (0..count)
            .map(|_| Annotation::read(pool, &mut input))
            .collect::<Result<Vec<_>>>()?;
        out.push(annotations);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_values_survive_encoding() {
        let annotation = Annotation::new("Ldemo/Meta;")
            .element("count", ElementValue::Int(3))
            .element("label", ElementValue::String("x".into()))
            .element("type", ElementValue::Class("Ljava/lang/String;".into()))
            .element(
                "tags",
                ElementValue::Array(vec![ElementValue::Long(1), ElementValue::Long(2)]),
            )
            .element(
                "inner",
                ElementValue::Annotation(
                    Annotation::new("Ljava/lang/Deprecated;")
                        .element("since", ElementValue::String("9".into())),
                ),
            );

        let mut pool = ConstantPool::new();
        let bytes = write_annotations(std::slice::from_ref(&annotation), &mut pool).unwrap();
        let read = read_annotations(&pool, &bytes).unwrap();
        assert_eq!(read, vec![annotation]);
    }

    #[test]
    fn parameter_annotations_keep_positions() {
        let params = vec![
            vec![],
            vec![Annotation::new("Ljava/lang/Deprecated;")],
        ];
        let mut pool = ConstantPool::new();
        let bytes = write_parameter_annotations(&params, &mut pool).unwrap();
        assert_eq!(bytes[0], 2);
        assert_eq!(read_parameter_annotations(&pool, &bytes).unwrap(), params);
    }

    #[test]
    fn lookup_by_name() {
        let annotation = Annotation::new("Ldemo/Meta;").element("value", ElementValue::Double(0.5));
        assert_eq!(annotation.get("value"), Some(&ElementValue::Double(0.5)));
        assert_eq!(annotation.get("other"), None);
    }
}
