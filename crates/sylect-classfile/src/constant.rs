//! Class file constant pool.
//!
//! Entries are deduplicated: asking for the same constant twice returns the
//! same index. Index 0 is never used, and `Long`/`Double` entries take two
//! indices, exactly as the class file format lays them out.

use rustc_hash::FxHashMap;

use crate::bytes::{ByteReader, ByteWriter};
use crate::error::{ClassFileError, Result};

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// One constant pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name: u16 },
    String { value: u16 },
    Fieldref { class: u16, name_and_type: u16 },
    Methodref { class: u16, name_and_type: u16 },
    InterfaceMethodref { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    /// Entry kinds the compiler never creates but may meet in host classes.
    Other { tag: u8 },
}

impl Constant {
    /// Number of pool indices the entry occupies.
    fn width(&self) -> u16 {
        match self {
            Self::Long(_) | Self::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Hashable form of [`Constant`] for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    Utf8(String),
    Integer(i32),
    Float(u32), // Bit pattern for hashing
    Long(i64),
    Double(u64), // Bit pattern for hashing
    Class(u16),
    String(u16),
    Fieldref(u16, u16),
    Methodref(u16, u16),
    InterfaceMethodref(u16, u16),
    NameAndType(u16, u16),
}

/// A deduplicating constant pool.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    /// Slot 0 and the upper half of wide entries are `None`.
    entries: Vec<Option<Constant>>,
    index: FxHashMap<ConstantKey, u16>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self {
            entries: vec![None],
            index: FxHashMap::default(),
        }
    }
}

/// Pools are equal when every index holds the same entry.
impl PartialEq for ConstantPool {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `constant_pool_count` value: one more than the highest index.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }

    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(index as usize).and_then(Option::as_ref)
    }

    fn intern(&mut self, key: ConstantKey, constant: Constant) -> Result<u16> {
        if let Some(&idx) = self.index.get(&key) {
            return Ok(idx);
        }
        let idx = self.push(constant)?;
        self.index.insert(key, idx);
        Ok(idx)
    }

    /// Append without deduplication.
    fn push(&mut self, constant: Constant) -> Result<u16> {
        let width = constant.width() as usize;
        let idx = self.entries.len();
        if idx + width > u16::MAX as usize {
            return Err(ClassFileError::ConstantPoolOverflow { count: idx + width });
        }
        self.entries.push(Some(constant));
        if width == 2 {
            self.entries.push(None);
        }
        Ok(idx as u16)
    }

    // ==========================================================================
    // Adding entries
    // ==========================================================================

    pub fn utf8(&mut self, value: &str) -> Result<u16> {
        let encoded = encode_modified_utf8(value).len();
        if encoded > u16::MAX as usize {
            return Err(ClassFileError::StringTooLong { length: encoded });
        }
        self.intern(
            ConstantKey::Utf8(value.to_string()),
            Constant::Utf8(value.to_string()),
        )
    }

    pub fn integer(&mut self, value: i32) -> Result<u16> {
        self.intern(ConstantKey::Integer(value), Constant::Integer(value))
    }

    pub fn float(&mut self, value: f32) -> Result<u16> {
        self.intern(ConstantKey::Float(value.to_bits()), Constant::Float(value))
    }

    pub fn long(&mut self, value: i64) -> Result<u16> {
        self.intern(ConstantKey::Long(value), Constant::Long(value))
    }

    pub fn double(&mut self, value: f64) -> Result<u16> {
        self.intern(ConstantKey::Double(value.to_bits()), Constant::Double(value))
    }

    /// A `Class` entry. Array classes use their descriptor as name (`[I`).
    pub fn class(&mut self, name: &str) -> Result<u16> {
        let name = self.utf8(name)?;
        self.intern(ConstantKey::Class(name), Constant::Class { name })
    }

    pub fn string(&mut self, value: &str) -> Result<u16> {
        let value = self.utf8(value)?;
        self.intern(ConstantKey::String(value), Constant::String { value })
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name = self.utf8(name)?;
        let descriptor = self.utf8(descriptor)?;
        self.intern(
            ConstantKey::NameAndType(name, descriptor),
            Constant::NameAndType { name, descriptor },
        )
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        let class = self.class(owner)?;
        let name_and_type = self.name_and_type(name, descriptor)?;
        self.intern(
            ConstantKey::Fieldref(class, name_and_type),
            Constant::Fieldref {
                class,
                name_and_type,
            },
        )
    }

    pub fn method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> Result<u16> {
        let class = self.class(owner)?;
        let name_and_type = self.name_and_type(name, descriptor)?;
        if interface {
            self.intern(
                ConstantKey::InterfaceMethodref(class, name_and_type),
                Constant::InterfaceMethodref {
                    class,
                    name_and_type,
                },
            )
        } else {
            self.intern(
                ConstantKey::Methodref(class, name_and_type),
                Constant::Methodref {
                    class,
                    name_and_type,
                },
            )
        }
    }

    // ==========================================================================
    // Lookups (used by the reader)
    // ==========================================================================

    pub fn utf8_at(&self, index: u16) -> Result<&str> {
        match self.get(index) {
            Some(Constant::Utf8(s)) => Ok(s),
            other => Err(ClassFileError::malformed(format!(
                "expected Utf8 at #{index}, found {other:?}"
            ))),
        }
    }

    pub fn class_name_at(&self, index: u16) -> Result<&str> {
        match self.get(index) {
            Some(Constant::Class { name }) => self.utf8_at(*name),
            other => Err(ClassFileError::malformed(format!(
                "expected Class at #{index}, found {other:?}"
            ))),
        }
    }

    // ==========================================================================
    // Serialization
    // ==========================================================================

    pub(crate) fn write(&self, out: &mut ByteWriter) {
        out.u2(self.entries.len() as u16);
        for entry in self.entries.iter().flatten() {
            match entry {
                Constant::Utf8(s) => {
                    let bytes = encode_modified_utf8(s);
                    out.u1(TAG_UTF8);
                    out.u2(bytes.len() as u16);
                    out.bytes(&bytes);
                }
                Constant::Integer(v) => {
                    out.u1(TAG_INTEGER);
                    out.u4(*v as u32);
                }
                Constant::Float(v) => {
                    out.u1(TAG_FLOAT);
                    out.u4(v.to_bits());
                }
                Constant::Long(v) => {
                    out.u1(TAG_LONG);
                    out.bytes(&v.to_be_bytes());
                }
                Constant::Double(v) => {
                    out.u1(TAG_DOUBLE);
                    out.bytes(&v.to_bits().to_be_bytes());
                }
                Constant::Class { name } => {
                    out.u1(TAG_CLASS);
                    out.u2(*name);
                }
                Constant::String { value } => {
                    out.u1(TAG_STRING);
                    out.u2(*value);
                }
                Constant::Fieldref {
                    class,
                    name_and_type,
                } => {
                    out.u1(TAG_FIELDREF);
                    out.u2(*class);
                    out.u2(*name_and_type);
                }
                Constant::Methodref {
                    class,
                    name_and_type,
                } => {
                    out.u1(TAG_METHODREF);
                    out.u2(*class);
                    out.u2(*name_and_type);
                }
                Constant::InterfaceMethodref {
                    class,
                    name_and_type,
                } => {
                    out.u1(TAG_INTERFACE_METHODREF);
                    out.u2(*class);
                    out.u2(*name_and_type);
                }
                Constant::NameAndType { name, descriptor } => {
                    out.u1(TAG_NAME_AND_TYPE);
                    out.u2(*name);
                    out.u2(*descriptor);
                }
                // Never created by the builder methods above.
                Constant::Other { .. } => {}
            }
        }
    }

    /// Parse a pool, leaving `input` positioned after it.
    pub(crate) fn read(input: &mut ByteReader<'_>) -> Result<Self> {
        let count = input.u2()? as usize;
        if count == 0 {
            return Err(ClassFileError::malformed("constant pool count is zero"));
        }
        let mut pool = Self::default();
        while pool.entries.len() < count {
            let tag = input.u1()?;
            let constant = match tag {
                TAG_UTF8 => {
                    let len = input.u2()? as usize;
                    Constant::Utf8(decode_modified_utf8(input.take(len)?)?)
                }
                TAG_INTEGER => Constant::Integer(input.u4()? as i32),
                TAG_FLOAT => Constant::Float(f32::from_bits(input.u4()?)),
                TAG_LONG => {
                    let hi = input.u4()? as u64;
                    let lo = input.u4()? as u64;
                    Constant::Long(((hi << 32) | lo) as i64)
                }
                TAG_DOUBLE => {
                    let hi = input.u4()? as u64;
                    let lo = input.u4()? as u64;
                    Constant::Double(f64::from_bits((hi << 32) | lo))
                }
                TAG_CLASS => Constant::Class { name: input.u2()? },
                TAG_STRING => Constant::String { value: input.u2()? },
                TAG_FIELDREF | TAG_METHODREF | TAG_INTERFACE_METHODREF => {
                    let class = input.u2()?;
                    let name_and_type = input.u2()?;
                    match tag {
                        TAG_FIELDREF => Constant::Fieldref {
                            class,
                            name_and_type,
                        },
                        TAG_METHODREF => Constant::Methodref {
                            class,
                            name_and_type,
                        },
                        _ => Constant::InterfaceMethodref {
                            class,
                            name_and_type,
                        },
                    }
                }
                TAG_NAME_AND_TYPE => Constant::NameAndType {
                    name: input.u2()?,
                    descriptor: input.u2()?,
                },
                TAG_METHOD_HANDLE => {
                    input.take(3)?;
                    Constant::Other { tag }
                }
                TAG_METHOD_TYPE | TAG_MODULE | TAG_PACKAGE => {
                    input.take(2)?;
                    Constant::Other { tag }
                }
                TAG_DYNAMIC | TAG_INVOKE_DYNAMIC => {
                    input.take(4)?;
                    Constant::Other { tag }
                }
                _ => {
                    return Err(ClassFileError::malformed(format!(
                        "unknown constant tag {tag} at byte {}",
                        input.position() - 1
                    )));
                }
            };
            pool.push(constant)?;
        }
        if pool.entries.len() != count {
            return Err(ClassFileError::malformed("wide constant overruns pool"));
        }
        Ok(pool)
    }
}

// ============================================================================
// Modified UTF-8
// ============================================================================

/// Encode as the class file's modified UTF-8: NUL is two bytes and
/// supplementary characters are surrogate pairs.
fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    let bad = || ClassFileError::malformed("invalid modified UTF-8");
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i] as u16;
        if b & 0x80 == 0 {
            units.push(b);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = *bytes.get(i + 1).ok_or_else(bad)? as u16;
            units.push(((b & 0x1F) << 6) | (b2 & 0x3F));
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = *bytes.get(i + 1).ok_or_else(bad)? as u16;
            let b3 = *bytes.get(i + 2).ok_or_else(bad)? as u16;
            units.push(((b & 0x0F) << 12) | ((b2 & 0x3F) << 6) | (b3 & 0x3F));
            i += 3;
        } else {
            return Err(bad());
        }
    }
    String::from_utf16(&units).map_err(|_| bad())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_zero_is_reserved() {
        let mut pool = ConstantPool::new();
        assert!(pool.is_empty());
        assert_eq!(pool.utf8("Code").unwrap(), 1);
        assert_eq!(pool.count(), 2);
        assert_eq!(pool.get(0), None);
    }

    #[test]
    fn deduplication() {
        let mut pool = ConstantPool::new();
        let a = pool.class("java/lang/Object").unwrap();
        let b = pool.class("java/lang/Object").unwrap();
        assert_eq!(a, b);
        // Utf8 + Class
        assert_eq!(pool.count(), 3);

        let m1 = pool.method_ref("a/B", "run", "()V", false).unwrap();
        let m2 = pool.method_ref("a/B", "run", "()V", true).unwrap();
        assert_ne!(m1, m2);
        assert_eq!(pool.method_ref("a/B", "run", "()V", false).unwrap(), m1);
    }

    #[test]
    fn wide_entries_take_two_slots() {
        let mut pool = ConstantPool::new();
        let long = pool.long(1 << 40).unwrap();
        let next = pool.integer(7).unwrap();
        assert_eq!(next, long + 2);
        assert_eq!(pool.get(long + 1), None);
    }

    #[test]
    fn float_dedup_uses_bits() {
        let mut pool = ConstantPool::new();
        let pos = pool.float(0.0).unwrap();
        let neg = pool.float(-0.0).unwrap();
        assert_ne!(pos, neg);
        let nan_a = pool.double(f64::NAN).unwrap();
        let nan_b = pool.double(f64::NAN).unwrap();
        assert_eq!(nan_a, nan_b);
    }

    #[test]
    fn write_then_read_preserves_entries() {
        let mut pool = ConstantPool::new();
        pool.string("h\u{e9}llo\0 \u{1F600}").unwrap();
        pool.double(2.5).unwrap();
        pool.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;")
            .unwrap();

        let mut out = ByteWriter::new();
        pool.write(&mut out);
        let bytes = out.into_bytes();
        let mut input = ByteReader::new(&bytes);
        let read = ConstantPool::read(&mut input).unwrap();

        assert_eq!(input.remaining(), 0);
        assert_eq!(read.count(), pool.count());
        for i in 1..pool.count() as u16 {
            assert_eq!(read.get(i), pool.get(i), "entry #{i}");
        }
    }

    #[test]
    fn nul_is_encoded_in_two_bytes() {
        assert_eq!(encode_modified_utf8("\0"), vec![0xC0, 0x80]);
        assert_eq!(encode_modified_utf8("A").len(), 1);
        // One supplementary character: two surrogates of three bytes each.
        assert_eq!(encode_modified_utf8("\u{1F600}").len(), 6);
    }

    #[test]
    fn class_name_lookup_checks_kind() {
        let mut pool = ConstantPool::new();
        let class = pool.class("demo/Main").unwrap();
        let utf8 = pool.utf8("x").unwrap();
        assert_eq!(pool.class_name_at(class).unwrap(), "demo/Main");
        assert!(pool.class_name_at(utf8).is_err());
    }
}
