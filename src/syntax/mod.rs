//! Host-facing syntax tree abstraction
//!
//! Architecture: Anti-Corruption Layer - The host's parsed source is translated
//! into explicit, total node variants before any rule sees it
//! - A definition is a class or a function; methods are a classified view, not
//!   a separate input kind
//! - Decorator shapes are plain data (dotted path, optional call arguments), so
//!   "does not match" is a predicate, never a caught exception
//! - The crate never reads source text; the host owns parsing entirely

use std::collections::VecDeque;

/// Raw definition kind as reported by the host's parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    /// A class definition
    Class,
    /// A function definition (free function or method)
    Function,
}

/// Classified view over a definition node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    /// A class definition
    Class,
    /// A free function: a function whose first parameter is not a
    /// conventional receiver
    Function,
    /// A function whose first parameter is named exactly `self` or `cls`
    Method,
}

/// A positional argument passed to a decorator invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// A string literal with its value
    Str(String),
    /// Any non-string expression (list, number, call, ...)
    Other,
}

impl Argument {
    /// String literal argument
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// The literal value if this argument is a string literal
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            Self::Other => None,
        }
    }
}

/// A decorator attached to a definition
///
/// `path` is the dotted callee expression (`pytest.mark.jira` becomes
/// `["pytest", "mark", "jira"]`); `args` is `Some` only when the decorator
/// was actually invoked. A bare reference like `@pytest.mark.smoke` has
/// `args: None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decorator {
    /// Dotted callee path segments in source order
    pub path: Vec<String>,
    /// Positional arguments when invoked; `None` for a bare reference
    pub args: Option<Vec<Argument>>,
}

impl Decorator {
    /// An invoked decorator: `@a.b.c(args...)`
    pub fn call<I, S>(path: I, args: Vec<Argument>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { path: path.into_iter().map(Into::into).collect(), args: Some(args) }
    }

    /// A bare decorator reference without a call: `@a.b.c` or `@name`
    pub fn reference<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { path: path.into_iter().map(Into::into).collect(), args: None }
    }

    /// Convenience for the shape this crate checks: `@pytest.mark.<name>(args...)`
    pub fn pytest_mark(name: impl Into<String>, args: Vec<Argument>) -> Self {
        Self::call(["pytest".to_string(), "mark".to_string(), name.into()], args)
    }
}

/// A class or function definition with everything the rules need to know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefNode {
    /// Raw kind from the host's parser
    pub kind: DefKind,
    /// Definition name
    pub name: String,
    /// 1-based starting line in the source file
    pub line: usize,
    /// Parameter names in declaration order (empty for classes)
    pub params: Vec<String>,
    /// Decorators in source order
    pub decorators: Vec<Decorator>,
    /// Nested definitions (methods of a class, inner functions)
    pub body: Vec<DefNode>,
}

impl DefNode {
    /// A class definition
    pub fn class(name: impl Into<String>, line: usize) -> Self {
        Self {
            kind: DefKind::Class,
            name: name.into(),
            line,
            params: Vec::new(),
            decorators: Vec::new(),
            body: Vec::new(),
        }
    }

    /// A function definition
    pub fn function(name: impl Into<String>, line: usize) -> Self {
        Self { kind: DefKind::Function, ..Self::class(name, line) }
    }

    /// Set the parameter names
    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a decorator
    pub fn with_decorator(mut self, decorator: Decorator) -> Self {
        self.decorators.push(decorator);
        self
    }

    /// Nest a child definition
    pub fn with_child(mut self, child: DefNode) -> Self {
        self.body.push(child);
        self
    }

    /// Classify this definition
    ///
    /// A function is a method iff its first parameter is named exactly
    /// `self` or `cls`; zero-parameter functions are never methods.
    pub fn classify(&self) -> TestKind {
        match self.kind {
            DefKind::Class => TestKind::Class,
            DefKind::Function => match self.params.first().map(String::as_str) {
                Some("self") | Some("cls") => TestKind::Method,
                _ => TestKind::Function,
            },
        }
    }
}

/// A parsed source file as supplied by the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTree {
    /// Top-level definitions in source order
    pub body: Vec<DefNode>,
}

impl SourceTree {
    /// Build a tree from top-level definitions
    pub fn new(body: Vec<DefNode>) -> Self {
        Self { body }
    }

    /// Walk every definition breadth-first: all top-level definitions
    /// before any nested ones, each level in source order
    pub fn walk(&self) -> Walk<'_> {
        Walk { queue: self.body.iter().collect() }
    }
}

/// Breadth-first iterator over every definition in a [`SourceTree`]
#[derive(Debug)]
pub struct Walk<'a> {
    queue: VecDeque<&'a DefNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a DefNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        self.queue.extend(node.body.iter());
        Some(node)
    }
}
