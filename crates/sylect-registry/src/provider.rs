//! Host class providers.
//!
//! A provider turns a class name into a [`ClassMeta`] for a class that is
//! not part of the current source set. The table asks at most once per name
//! and caches the answer.
//!
//! ```text
//! ClasspathProvider
//! ├── JdkClasses              built-in model of common JDK classes
//! ├── DirectoryClassProvider  <root>/a/b/C.class
//! └── JarClassProvider        a/b/C.class inside a jar
//! ```

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sylect_classfile::ClassReader;
use sylect_core::{ClassMeta, CompileError, Result};
use tracing::trace;
use zip::ZipArchive;
use zip::result::ZipError;

/// Source of host class metadata.
///
/// `Ok(None)` means the provider does not know the class. Errors are for
/// classes that exist but could not be read.
pub trait ClassProvider: Send + Sync {
    fn load(&self, name: &str) -> Result<Option<ClassMeta>>;
}

impl<P: ClassProvider + ?Sized> ClassProvider for Box<P> {
    fn load(&self, name: &str) -> Result<Option<ClassMeta>> {
        (**self).load(name)
    }
}

/// A provider that knows no classes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClasses;

impl ClassProvider for NoClasses {
    fn load(&self, _name: &str) -> Result<Option<ClassMeta>> {
        Ok(None)
    }
}

/// Decode class file bytes into metadata.
pub fn introspect(bytes: &[u8]) -> Result<ClassMeta> {
    let parsed = ClassReader::new(bytes).read()?;
    Ok(parsed.to_class_meta())
}

fn io_error(name: &str, err: io::Error) -> CompileError {
    CompileError::class_format(format!("reading {name}: {err}"))
}

// ============================================================================
// Classpath chain
// ============================================================================

/// Ordered chain of providers; the first one that knows a class wins.
#[derive(Default)]
pub struct ClasspathProvider {
    entries: Vec<Box<dyn ClassProvider>>,
}

impl ClasspathProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl ClassProvider + 'static) -> Self {
        self.entries.push(Box::new(provider));
        self
    }

    pub fn push(&mut self, provider: impl ClassProvider + 'static) {
        self.entries.push(Box::new(provider));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ClassProvider for ClasspathProvider {
    fn load(&self, name: &str) -> Result<Option<ClassMeta>> {
        for entry in &self.entries {
            if let Some(meta) = entry.load(name)? {
                return Ok(Some(meta));
            }
        }
        Ok(None)
    }
}

// ============================================================================
// Directory
// ============================================================================

/// Compiled classes laid out under a directory by package.
#[derive(Debug, Clone)]
pub struct DirectoryClassProvider {
    root: PathBuf,
}

impl DirectoryClassProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(name.split('/'));
        path.set_extension("class");
        path
    }
}

impl ClassProvider for DirectoryClassProvider {
    fn load(&self, name: &str) -> Result<Option<ClassMeta>> {
        let path = self.path_of(name);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(name, err)),
        };
        trace!(class = name, path = %path.display(), "introspecting class file");
        introspect(&bytes).map(Some)
    }
}

// ============================================================================
// Jar
// ============================================================================

/// Compiled classes stored in a jar archive.
///
/// The archive reader needs `&mut` access, so lookups are serialized.
pub struct JarClassProvider<R: Read + Seek + Send = File> {
    archive: Mutex<ZipArchive<R>>,
}

impl JarClassProvider<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| io_error(&path.display().to_string(), err))?;
        Self::from_reader(file)
    }
}

impl<R: Read + Seek + Send> JarClassProvider<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|err| CompileError::class_format(format!("opening jar: {err}")))?;
        Ok(Self {
            archive: Mutex::new(archive),
        })
    }
}

impl<R: Read + Seek + Send> ClassProvider for JarClassProvider<R> {
    fn load(&self, name: &str) -> Result<Option<ClassMeta>> {
        let entry = format!("{name}.class");
        let mut archive = self
            .archive
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut file = match archive.by_name(&entry) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => {
                return Err(CompileError::class_format(format!("reading {entry}: {err}")));
            }
        };
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)
            .map_err(|err| io_error(&entry, err))?;
        trace!(class = name, "introspecting jar entry");
        introspect(&bytes).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use sylect_classfile::{ClassAccess, ClassFile, FieldAccess, FieldInfo};
    use sylect_core::TypeMeta;

    fn sample_class(name: &str) -> Vec<u8> {
        let mut class = ClassFile::new(52, ClassAccess::PUBLIC | ClassAccess::SUPER, name);
        class.fields.push(FieldInfo {
            access: FieldAccess::PUBLIC | FieldAccess::STATIC,
            name: "LIMIT".into(),
            descriptor: "I".into(),
            annotations: Vec::new(),
        });
        class.to_bytes().unwrap()
    }

    struct Fixed(&'static str);

    impl ClassProvider for Fixed {
        fn load(&self, name: &str) -> Result<Option<ClassMeta>> {
            Ok((name == self.0).then(|| ClassMeta::new(name)))
        }
    }

    #[test]
    fn chain_returns_first_hit() {
        let chain = ClasspathProvider::new()
            .with(NoClasses)
            .with(Fixed("a/First"))
            .with(Fixed("a/Second"));
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.load("a/First").unwrap().unwrap().name, "a/First");
        assert_eq!(chain.load("a/Second").unwrap().unwrap().name, "a/Second");
        assert!(chain.load("a/Third").unwrap().is_none());
    }

    #[test]
    fn directory_provider_reads_class_files() {
        let root = std::env::temp_dir().join(format!("sylect-dir-provider-{}", std::process::id()));
        std::fs::create_dir_all(root.join("demo")).unwrap();
        let path = root.join("demo").join("Limits.class");
        std::fs::write(path, sample_class("demo/Limits")).unwrap();

        let provider = DirectoryClassProvider::new(&root);
        let meta = provider.load("demo/Limits").unwrap().unwrap();
        assert_eq!(meta.name, "demo/Limits");
        assert_eq!(meta.base_class_name.as_deref(), Some("java/lang/Object"));
        let field = meta.field("LIMIT").unwrap();
        assert!(field.is_static);
        assert_eq!(field.type_meta, TypeMeta::integer());

        assert!(provider.load("demo/Missing").unwrap().is_none());
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn directory_provider_rejects_garbage() {
        let root = std::env::temp_dir().join(format!("sylect-dir-garbage-{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("Broken.class"), b"not a class").unwrap();

        let err = DirectoryClassProvider::new(&root).load("Broken").unwrap_err();
        assert!(matches!(err, CompileError::ClassFormat { .. }));
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn jar_provider_reads_entries() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut jar = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::FileOptions::default();
            jar.start_file("demo/Limits.class", options).unwrap();
            jar.write_all(&sample_class("demo/Limits")).unwrap();
            jar.start_file("META-INF/MANIFEST.MF", options).unwrap();
            jar.write_all(b"Manifest-Version: 1.0\n").unwrap();
            jar.finish().unwrap();
        }
        buffer.set_position(0);

        let provider = JarClassProvider::from_reader(buffer).unwrap();
        let meta = provider.load("demo/Limits").unwrap().unwrap();
        assert!(meta.field("LIMIT").is_some());
        assert!(provider.load("demo/Other").unwrap().is_none());
    }

    #[test]
    fn jar_provider_rejects_non_archive() {
        let result = JarClassProvider::from_reader(Cursor::new(b"plain bytes".to_vec()));
        assert!(matches!(result, Err(CompileError::ClassFormat { .. })));
    }
}
