//! Built-in model of the JDK classes source programs commonly touch.
//!
//! The model lets the compiler run without a JDK on the classpath. Members
//! are listed by JVM descriptor and decoded with the same routine the class
//! reader uses, so a class from here is indistinguishable from one read off
//! disk.

use sylect_core::{ClassMeta, FieldMeta, MethodMeta, ParameterMeta, Result, TypeMeta, names};

use crate::provider::ClassProvider;

const STATIC: u8 = 1;
const ABSTRACT: u8 = 2;
const NATIVE: u8 = 4;

struct Builtin {
    name: &'static str,
    interface: bool,
    base: Option<&'static str>,
    interfaces: &'static [&'static str],
    /// `(name, static, descriptor)`
    fields: &'static [(&'static str, bool, &'static str)],
    /// `(name, flags, descriptor)`
    methods: &'static [(&'static str, u8, &'static str)],
}

const OBJECT: Option<&str> = Some(names::OBJECT);

const EXCEPTION_CONSTRUCTORS: &[(&str, u8, &str)] = &[
    ("<init>", 0, "()V"),
    ("<init>", 0, "(Ljava/lang/String;)V"),
];

const BUILTINS: &[Builtin] = &[
    Builtin {
        name: names::OBJECT,
        interface: false,
        base: None,
        interfaces: &[],
        fields: &[],
        methods: &[
            ("<init>", 0, "()V"),
            ("hashCode", NATIVE, "()I"),
            ("equals", 0, "(Ljava/lang/Object;)Z"),
            ("toString", 0, "()Ljava/lang/String;"),
            ("getClass", NATIVE, "()Ljava/lang/Class;"),
        ],
    },
    Builtin {
        name: names::STRING,
        interface: false,
        base: OBJECT,
        interfaces: &["java/lang/Comparable"],
        fields: &[],
        methods: &[
            ("<init>", 0, "()V"),
            ("<init>", 0, "(Ljava/lang/String;)V"),
            ("<init>", 0, "([B)V"),
            ("<init>", 0, "([C)V"),
            ("length", 0, "()I"),
            ("isEmpty", 0, "()Z"),
            ("charAt", 0, "(I)C"),
            ("concat", 0, "(Ljava/lang/String;)Ljava/lang/String;"),
            ("equals", 0, "(Ljava/lang/Object;)Z"),
            ("hashCode", 0, "()I"),
            ("compareTo", 0, "(Ljava/lang/String;)I"),
            ("compareTo", 0, "(Ljava/lang/Object;)I"),
            ("indexOf", 0, "(Ljava/lang/String;)I"),
            ("substring", 0, "(I)Ljava/lang/String;"),
            ("substring", 0, "(II)Ljava/lang/String;"),
            ("toUpperCase", 0, "()Ljava/lang/String;"),
            ("toLowerCase", 0, "()Ljava/lang/String;"),
            ("trim", 0, "()Ljava/lang/String;"),
            ("toString", 0, "()Ljava/lang/String;"),
            ("toCharArray", 0, "()[C"),
            ("getBytes", 0, "()[B"),
            ("valueOf", STATIC, "(I)Ljava/lang/String;"),
            ("valueOf", STATIC, "(J)Ljava/lang/String;"),
            ("valueOf", STATIC, "(F)Ljava/lang/String;"),
            ("valueOf", STATIC, "(D)Ljava/lang/String;"),
            ("valueOf", STATIC, "(Ljava/lang/Object;)Ljava/lang/String;"),
        ],
    },
    Builtin {
        name: "java/lang/StringBuilder",
        interface: false,
        base: OBJECT,
        interfaces: &[],
        fields: &[],
        methods: &[
            ("<init>", 0, "()V"),
            ("<init>", 0, "(Ljava/lang/String;)V"),
            ("append", 0, "(I)Ljava/lang/StringBuilder;"),
            ("append", 0, "(J)Ljava/lang/StringBuilder;"),
            ("append", 0, "(F)Ljava/lang/StringBuilder;"),
            ("append", 0, "(D)Ljava/lang/StringBuilder;"),
            ("append", 0, "(C)Ljava/lang/StringBuilder;"),
            ("append", 0, "(Ljava/lang/String;)Ljava/lang/StringBuilder;"),
            ("append", 0, "(Ljava/lang/Object;)Ljava/lang/StringBuilder;"),
            ("length", 0, "()I"),
            ("reverse", 0, "()Ljava/lang/StringBuilder;"),
            ("toString", 0, "()Ljava/lang/String;"),
        ],
    },
    Builtin {
        name: "java/lang/System",
        interface: false,
        base: OBJECT,
        interfaces: &[],
        fields: &[
            ("out", true, "Ljava/io/PrintStream;"),
            ("err", true, "Ljava/io/PrintStream;"),
        ],
        methods: &[
            ("currentTimeMillis", STATIC | NATIVE, "()J"),
            ("nanoTime", STATIC | NATIVE, "()J"),
            ("exit", STATIC, "(I)V"),
            ("lineSeparator", STATIC, "()Ljava/lang/String;"),
            (
                "arraycopy",
                STATIC | NATIVE,
                "(Ljava/lang/Object;ILjava/lang/Object;II)V",
            ),
        ],
    },
    Builtin {
        name: "java/lang/Math",
        interface: false,
        base: OBJECT,
        interfaces: &[],
        fields: &[("PI", true, "D"), ("E", true, "D")],
        methods: &[
            ("abs", STATIC, "(I)I"),
            ("abs", STATIC, "(J)J"),
            ("abs", STATIC, "(F)F"),
            ("abs", STATIC, "(D)D"),
            ("max", STATIC, "(II)I"),
            ("max", STATIC, "(JJ)J"),
            ("max", STATIC, "(DD)D"),
            ("min", STATIC, "(II)I"),
            ("min", STATIC, "(JJ)J"),
            ("min", STATIC, "(DD)D"),
            ("sqrt", STATIC, "(D)D"),
            ("pow", STATIC, "(DD)D"),
            ("floor", STATIC, "(D)D"),
            ("ceil", STATIC, "(D)D"),
            ("random", STATIC, "()D"),
        ],
    },
    Builtin {
        name: "java/lang/Number",
        interface: false,
        base: OBJECT,
        interfaces: &[],
        fields: &[],
        methods: &[
            ("<init>", 0, "()V"),
            ("intValue", ABSTRACT, "()I"),
            ("longValue", ABSTRACT, "()J"),
            ("floatValue", ABSTRACT, "()F"),
            ("doubleValue", ABSTRACT, "()D"),
        ],
    },
    Builtin {
        name: "java/lang/Integer",
        interface: false,
        base: Some("java/lang/Number"),
        interfaces: &["java/lang/Comparable"],
        fields: &[("MAX_VALUE", true, "I"), ("MIN_VALUE", true, "I")],
        methods: &[
            ("<init>", 0, "(I)V"),
            ("intValue", 0, "()I"),
            ("longValue", 0, "()J"),
            ("floatValue", 0, "()F"),
            ("doubleValue", 0, "()D"),
            ("parseInt", STATIC, "(Ljava/lang/String;)I"),
            ("valueOf", STATIC, "(I)Ljava/lang/Integer;"),
            ("toString", STATIC, "(I)Ljava/lang/String;"),
            ("toHexString", STATIC, "(I)Ljava/lang/String;"),
            ("toBinaryString", STATIC, "(I)Ljava/lang/String;"),
            ("compare", STATIC, "(II)I"),
            ("compareTo", 0, "(Ljava/lang/Object;)I"),
        ],
    },
    Builtin {
        name: "java/lang/Long",
        interface: false,
        base: Some("java/lang/Number"),
        interfaces: &["java/lang/Comparable"],
        fields: &[("MAX_VALUE", true, "J"), ("MIN_VALUE", true, "J")],
        methods: &[
            ("<init>", 0, "(J)V"),
            ("intValue", 0, "()I"),
            ("longValue", 0, "()J"),
            ("floatValue", 0, "()F"),
            ("doubleValue", 0, "()D"),
            ("parseLong", STATIC, "(Ljava/lang/String;)J"),
            ("valueOf", STATIC, "(J)Ljava/lang/Long;"),
            ("toString", STATIC, "(J)Ljava/lang/String;"),
            ("compare", STATIC, "(JJ)I"),
            ("compareTo", 0, "(Ljava/lang/Object;)I"),
        ],
    },
    Builtin {
        name: names::CLASS,
        interface: false,
        base: OBJECT,
        interfaces: &[],
        fields: &[],
        methods: &[
            ("getName", 0, "()Ljava/lang/String;"),
            ("getSimpleName", 0, "()Ljava/lang/String;"),
            ("isInterface", NATIVE, "()Z"),
        ],
    },
    Builtin {
        name: "java/lang/Throwable",
        interface: false,
        base: OBJECT,
        interfaces: &[],
        fields: &[],
        methods: &[
            ("<init>", 0, "()V"),
            ("<init>", 0, "(Ljava/lang/String;)V"),
            ("getMessage", 0, "()Ljava/lang/String;"),
            ("printStackTrace", 0, "()V"),
            ("toString", 0, "()Ljava/lang/String;"),
        ],
    },
    Builtin {
        name: "java/lang/Exception",
        interface: false,
        base: Some("java/lang/Throwable"),
        interfaces: &[],
        fields: &[],
        methods: EXCEPTION_CONSTRUCTORS,
    },
    Builtin {
        name: names::RUNTIME_EXCEPTION,
        interface: false,
        base: Some("java/lang/Exception"),
        interfaces: &[],
        fields: &[],
        methods: EXCEPTION_CONSTRUCTORS,
    },
    Builtin {
        name: "java/lang/AutoCloseable",
        interface: true,
        base: OBJECT,
        interfaces: &[],
        fields: &[],
        methods: &[("close", ABSTRACT, "()V")],
    },
    Builtin {
        name: "java/lang/Runnable",
        interface: true,
        base: OBJECT,
        interfaces: &[],
        fields: &[],
        methods: &[("run", ABSTRACT, "()V")],
    },
    Builtin {
        name: "java/lang/Comparable",
        interface: true,
        base: OBJECT,
        interfaces: &[],
        fields: &[],
        methods: &[("compareTo", ABSTRACT, "(Ljava/lang/Object;)I")],
    },
    Builtin {
        name: "java/io/PrintStream",
        interface: false,
        base: OBJECT,
        interfaces: &[],
        fields: &[],
        methods: &[
            ("println", 0, "()V"),
            ("println", 0, "(Z)V"),
            ("println", 0, "(C)V"),
            ("println", 0, "(I)V"),
            ("println", 0, "(J)V"),
            ("println", 0, "(F)V"),
            ("println", 0, "(D)V"),
            ("println", 0, "(Ljava/lang/String;)V"),
            ("println", 0, "(Ljava/lang/Object;)V"),
            ("print", 0, "(I)V"),
            ("print", 0, "(J)V"),
            ("print", 0, "(F)V"),
            ("print", 0, "(D)V"),
            ("print", 0, "(Ljava/lang/String;)V"),
            ("print", 0, "(Ljava/lang/Object;)V"),
            ("flush", 0, "()V"),
        ],
    },
    Builtin {
        name: "java/lang/annotation/Annotation",
        interface: true,
        base: OBJECT,
        interfaces: &[],
        fields: &[],
        methods: &[("annotationType", ABSTRACT, "()Ljava/lang/Class;")],
    },
    Builtin {
        name: "java/lang/Deprecated",
        interface: true,
        base: OBJECT,
        interfaces: &["java/lang/annotation/Annotation"],
        fields: &[],
        methods: &[
            ("since", ABSTRACT, "()Ljava/lang/String;"),
            ("forRemoval", ABSTRACT, "()Z"),
        ],
    },
    Builtin {
        name: "java/lang/FunctionalInterface",
        interface: true,
        base: OBJECT,
        interfaces: &["java/lang/annotation/Annotation"],
        fields: &[],
        methods: &[],
    },
    Builtin {
        name: "java/lang/SuppressWarnings",
        interface: true,
        base: OBJECT,
        interfaces: &["java/lang/annotation/Annotation"],
        fields: &[],
        methods: &[("value", ABSTRACT, "()[Ljava/lang/String;")],
    },
];

/// Provider backed by the built-in JDK model.
#[derive(Debug, Default, Clone, Copy)]
pub struct JdkClasses;

impl JdkClasses {
    /// Names of every modelled class.
    pub fn names() -> impl Iterator<Item = &'static str> {
        BUILTINS.iter().map(|b| b.name)
    }

    fn build(builtin: &Builtin) -> Option<ClassMeta> {
        let mut meta = ClassMeta::new(builtin.name);
        meta.is_interface = builtin.interface;
        meta.base_class_name = builtin.base.map(str::to_string);
        meta.interfaces = builtin.interfaces.iter().map(|i| i.to_string()).collect();

        for &(name, is_static, descriptor) in builtin.fields {
            let ty = TypeMeta::from_descriptor(descriptor)?;
            meta.fields.push(FieldMeta::new(name, is_static, ty));
        }
        for &(name, flags, descriptor) in builtin.methods {
            let (params, return_type) = sylect_core::parse_method_descriptor(descriptor)?;
            let parameters = params
                .into_iter()
                .enumerate()
                .map(|(i, ty)| ParameterMeta::new(format!("arg{i}"), ty))
                .collect();
            meta.methods.push(MethodMeta::new(
                name,
                flags & STATIC != 0,
                flags & NATIVE != 0,
                flags & ABSTRACT != 0,
                return_type,
                parameters,
            ));
        }
        Some(meta)
    }
}

impl ClassProvider for JdkClasses {
    fn load(&self, name: &str) -> Result<Option<ClassMeta>> {
        Ok(BUILTINS
            .iter()
            .find(|b| b.name == name)
            .and_then(Self::build))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sylect_core::TypeKind;

    fn load(name: &str) -> ClassMeta {
        JdkClasses.load(name).unwrap().unwrap()
    }

    #[test]
    fn every_entry_decodes_completely() {
        for name in JdkClasses::names() {
            let builtin = BUILTINS.iter().find(|b| b.name == name).unwrap();
            let meta = load(name);
            assert_eq!(meta.fields.len(), builtin.fields.len(), "{name}");
            assert_eq!(meta.methods.len(), builtin.methods.len(), "{name}");
        }
    }

    #[test]
    fn object_is_the_root() {
        let object = load("java/lang/Object");
        assert_eq!(object.base_class_name, None);
        assert_eq!(load("java/lang/String").base_class_name.as_deref(), Some("java/lang/Object"));
    }

    #[test]
    fn system_out_is_a_static_print_stream() {
        let system = load("java/lang/System");
        let out = system.field("out").unwrap();
        assert!(out.is_static);
        assert_eq!(out.type_meta, TypeMeta::class("java/io/PrintStream"));

        let stream = load("java/io/PrintStream");
        assert!(stream.method("println", &[TypeMeta::integer()]).is_some());
        assert!(stream.method("println", &[TypeMeta::string()]).is_some());
        assert!(stream.method("println", &[TypeMeta::scalar(TypeKind::Boolean)]).is_some());
    }

    #[test]
    fn runtime_exception_has_message_constructor() {
        let rte = load("java/lang/RuntimeException");
        let init = rte.method("<init>", &[TypeMeta::string()]).unwrap();
        assert_eq!(init.descriptor(), "(Ljava/lang/String;)V");
        assert_eq!(rte.base_class_name.as_deref(), Some("java/lang/Exception"));
    }

    #[test]
    fn annotation_types_are_interfaces() {
        let deprecated = load("java/lang/Deprecated");
        assert!(deprecated.is_interface);
        let for_removal = deprecated.method_named("forRemoval").unwrap();
        assert_eq!(for_removal.return_type, TypeMeta::scalar(TypeKind::Boolean));

        let suppress = load("java/lang/SuppressWarnings");
        let value = suppress.method_named("value").unwrap();
        assert_eq!(value.return_type, TypeMeta::string().array_of());
    }

    #[test]
    fn unknown_names_are_not_modelled() {
        assert!(JdkClasses.load("java/util/ArrayList").unwrap().is_none());
    }
}
