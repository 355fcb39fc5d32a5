//! Well-known names and class-name helpers.
//!
//! Class names are kept in internal form (`java/lang/String`) everywhere in
//! the compiler. Dotted names only appear at the host boundary.

pub const OBJECT: &str = "java/lang/Object";
pub const STRING: &str = "java/lang/String";
pub const CLASS: &str = "java/lang/Class";
pub const RUNTIME_EXCEPTION: &str = "java/lang/RuntimeException";

/// Runtime name of instance initializers.
pub const INIT: &str = "<init>";

/// Source keyword that declares or calls a constructor.
pub const CONSTRUCTOR_KEYWORD: &str = "constructor";

/// Message carried by the trap emitted after a non-void method body.
pub const MISSING_RETURN_MESSAGE: &str = "No return statement";

/// Last `/`-separated segment of a class name.
pub fn short_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// `java.lang.String` to `java/lang/String`.
pub fn to_internal(dotted: &str) -> String {
    dotted.replace('.', "/")
}

/// `java/lang/String` to `java.lang.String`.
pub fn to_dotted(internal: &str) -> String {
    internal.replace('/', ".")
}
