//! Per-language allowlists: standard-library roots, builtins and the call
//! prefixes that usually mean "this crosses into another runtime".

use crate::facts::ReferenceContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    Go,
    Rust,
    JavaScript,
    TypeScript,
    Java,
    C,
    Cpp,
    CSharp,
    Other,
}

impl Language {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "python" | "py" => Language::Python,
            "go" | "golang" => Language::Go,
            "rust" | "rs" => Language::Rust,
            "javascript" | "js" | "jsx" | "mjs" => Language::JavaScript,
            "typescript" | "ts" | "tsx" => Language::TypeScript,
            "java" => Language::Java,
            "c" => Language::C,
            "cpp" | "c++" | "cc" | "cxx" => Language::Cpp,
            "csharp" | "c#" | "cs" => Language::CSharp,
            _ => Language::Other,
        }
    }

    pub fn stdlib(self) -> &'static [&'static str] {
        match self {
            Language::Python => PYTHON_STDLIB,
            Language::Go => GO_STDLIB,
            Language::Rust => RUST_STDLIB,
            Language::JavaScript | Language::TypeScript => JS_STDLIB,
            Language::Java => JAVA_STDLIB,
            Language::C | Language::Cpp => C_STDLIB,
            Language::CSharp => CSHARP_STDLIB,
            Language::Other => &[],
        }
    }

    pub fn builtins(self) -> &'static [&'static str] {
        match self {
            Language::Python => PYTHON_BUILTINS,
            Language::Go => GO_BUILTINS,
            Language::Rust => RUST_BUILTINS,
            Language::JavaScript | Language::TypeScript => JS_BUILTINS,
            Language::Java => JAVA_BUILTINS,
            Language::C | Language::Cpp => C_BUILTINS,
            Language::CSharp => CSHARP_BUILTINS,
            Language::Other => &[],
        }
    }

    pub fn bridge_prefixes(self) -> &'static [&'static str] {
        match self {
            Language::Python => PYTHON_BRIDGES,
            Language::Go => GO_BRIDGES,
            Language::Rust => RUST_BRIDGES,
            Language::JavaScript | Language::TypeScript => JS_BRIDGES,
            Language::Java => JAVA_BRIDGES,
            Language::C | Language::Cpp => C_BRIDGES,
            Language::CSharp => CSHARP_BRIDGES,
            Language::Other => &[],
        }
    }

    pub fn is_stdlib(self, head: &str, full: &str) -> bool {
        let table = self.stdlib();
        table.contains(&head) || table.contains(&full)
    }

    pub fn is_builtin(self, head: &str, full: &str) -> bool {
        let table = self.builtins();
        table.contains(&head) || table.contains(&full)
    }

    /// Bridge kind implied by the first heuristic prefix `name` starts with.
    pub fn bridge_hint(self, name: &str) -> Option<ReferenceContext> {
        self.bridge_prefixes()
            .iter()
            .find(|prefix| name.starts_with(**prefix))
            .map(|prefix| classify_bridge_prefix(prefix))
    }
}

fn classify_bridge_prefix(prefix: &str) -> ReferenceContext {
    let lowered = prefix.to_lowercase();
    let mentions = |markers: &[&str]| markers.iter().any(|marker| lowered.contains(marker));
    if mentions(&["process", "exec", "spawn", "system", "popen", "command", "runtime"]) {
        ReferenceContext::ProcessBridge
    } else if mentions(&[
        "grpc", "http", "fetch", "requests", "axios", "tonic", "reqwest", "aiohttp",
    ]) {
        ReferenceContext::ServiceBridge
    } else {
        ReferenceContext::FfiBridge
    }
}

/// Receivers that always refer to the enclosing object.
pub const SELF_RECEIVERS: &[&str] = &["self", "this", "cls", "super", "Self"];

const PYTHON_STDLIB: &[&str] = &[
    "abc", "argparse", "asyncio", "base64", "collections", "contextlib", "copy", "csv",
    "dataclasses", "datetime", "enum", "functools", "glob", "hashlib", "heapq", "inspect", "io",
    "itertools", "json", "logging", "math", "multiprocessing", "os", "pathlib", "pickle",
    "queue", "random", "re", "shutil", "signal", "socket", "sqlite3", "string", "struct",
    "subprocess", "sys", "tempfile", "threading", "time", "traceback", "typing", "unittest",
    "urllib", "uuid", "warnings", "weakref",
];

const GO_STDLIB: &[&str] = &[
    "bufio", "bytes", "context", "crypto", "errors", "filepath", "flag", "fmt", "http", "io",
    "ioutil", "json", "log", "math", "net", "os", "path", "reflect", "regexp", "runtime",
    "sort", "strconv", "strings", "sync", "syscall", "testing", "time", "unicode", "url",
    "atomic", "exec", "signal", "rand", "hex", "base64", "binary",
];

const RUST_STDLIB: &[&str] = &["std", "core", "alloc", "crate", "super"];

const JS_STDLIB: &[&str] = &[
    "Array", "Boolean", "console", "Date", "document", "Error", "exports", "globalThis",
    "Intl", "JSON", "Map", "Math", "module", "Number", "Object", "Promise", "Proxy", "Reflect",
    "RegExp", "Set", "String", "Symbol", "WeakMap", "window", "process", "Buffer", "fs", "path",
    "os", "util", "events", "crypto",
];

const JAVA_STDLIB: &[&str] = &[
    "java", "javax", "System", "String", "Math", "Integer", "Long", "Double", "Boolean",
    "Character", "Object", "List", "Map", "Set", "Arrays", "Collections", "Optional",
    "Objects", "Thread", "StringBuilder",
];

const C_STDLIB: &[&str] = &[
    "std", "printf", "fprintf", "sprintf", "snprintf", "malloc", "calloc", "realloc", "free",
    "memcpy", "memset", "memcmp", "strlen", "strcmp", "strncmp", "strcpy", "strncpy", "fopen",
    "fclose", "fread", "fwrite", "exit", "abort", "assert",
];

const CSHARP_STDLIB: &[&str] = &[
    "System", "Console", "Math", "String", "Task", "List", "Dictionary", "Enumerable", "File",
    "Path", "Environment", "Convert", "Guid", "DateTime",
];

const PYTHON_BUILTINS: &[&str] = &[
    "abs", "all", "any", "bool", "bytes", "callable", "chr", "dict", "dir", "enumerate",
    "Exception", "filter", "float", "format", "frozenset", "getattr", "hasattr", "hash", "id",
    "input", "int", "isinstance", "issubclass", "iter", "KeyError", "len", "list", "map", "max",
    "min", "next", "object", "open", "ord", "print", "property", "range", "repr", "reversed",
    "round", "RuntimeError", "set", "setattr", "sorted", "staticmethod", "classmethod", "str",
    "sum", "tuple", "type", "TypeError", "ValueError", "vars", "zip", "None", "True", "False",
];

const GO_BUILTINS: &[&str] = &[
    "append", "cap", "close", "complex", "copy", "delete", "len", "make", "new", "panic",
    "print", "println", "recover", "error", "string", "int", "int64", "int32", "uint",
    "uint64", "float64", "bool", "byte", "rune", "nil", "true", "false", "any",
];

const RUST_BUILTINS: &[&str] = &[
    "assert", "assert_eq", "assert_ne", "Box", "debug_assert", "Err", "eprintln", "format",
    "None", "Ok", "Option", "panic", "println", "Result", "Some", "String", "todo",
    "unimplemented", "unreachable", "Vec", "vec", "write", "writeln", "Default", "Clone",
    "Iterator", "Into", "From",
];

const JS_BUILTINS: &[&str] = &[
    "parseInt", "parseFloat", "isNaN", "isFinite", "setTimeout", "setInterval",
    "clearTimeout", "clearInterval", "encodeURIComponent", "decodeURIComponent", "require",
    "fetch", "structuredClone", "queueMicrotask", "undefined", "NaN", "Infinity",
];

const JAVA_BUILTINS: &[&str] = &[
    "println", "printf", "valueOf", "toString", "equals", "hashCode", "length", "size",
    "Exception", "RuntimeException", "IllegalArgumentException", "IllegalStateException",
];

const C_BUILTINS: &[&str] = &[
    "sizeof", "alignof", "offsetof", "static_cast", "dynamic_cast", "reinterpret_cast",
    "const_cast", "nullptr", "NULL", "main",
];

const CSHARP_BUILTINS: &[&str] = &["nameof", "typeof", "sizeof", "default", "var", "await"];

const PYTHON_BRIDGES: &[&str] = &[
    "ctypes.", "cffi.", "ffi.", "subprocess.", "os.system", "os.popen", "grpc.", "requests.",
    "httpx.", "aiohttp.",
];

const GO_BRIDGES: &[&str] = &["C.", "exec.Command", "grpc.", "http.Get", "http.Post", "cgo."];

const RUST_BRIDGES: &[&str] = &[
    "libc::", "ffi::", "std::process::Command", "Command::new", "tonic::", "reqwest::",
    "pyo3::", "napi::",
];

const JS_BRIDGES: &[&str] = &[
    "child_process.", "spawn", "execFile", "ffi.", "fetch", "axios.", "grpc.", "WebAssembly.",
];

const JAVA_BRIDGES: &[&str] = &[
    "System.loadLibrary", "ProcessBuilder", "Runtime.getRuntime", "io.grpc.", "JNI",
    "HttpClient.",
];

const C_BRIDGES: &[&str] = &["dlopen", "dlsym", "system", "popen", "execv", "Py", "JNIEnv"];

const CSHARP_BRIDGES: &[&str] = &["DllImport", "Process.Start", "Grpc.", "HttpClient."];
