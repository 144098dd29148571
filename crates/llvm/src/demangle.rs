//! A demangler for the subset of the Itanium C++ ABI mangling scheme that
//! element symbols use.
//!
//! Element entry points and the runtime functions they call are mangled with
//! a small, predictable vocabulary:
//!
//! | Encoding          | Meaning                              |
//! |-------------------|--------------------------------------|
//! | `_Z`              | Mangled-name prefix                  |
//! | `N ... E`         | Nested (qualified) name              |
//! | `<len><chars>`    | Source name of the given length      |
//! | `C1`/`C2`         | Constructor                          |
//! | `D1`/`D2`         | Destructor                           |
//! | `I ... E`         | Template argument list               |
//! | `P`/`R`/`K`       | Pointer, reference, `const`          |
//! | `i`, `j`, `c`, …  | Builtin types                        |
//!
//! Substitutions (`S...`) are not supported. A symbol that uses them, or any
//! other construct outside this vocabulary, fails to demangle and is passed
//! through untouched by [`try_demangle`]. That is sufficient for our inputs:
//! the `push` entry points that element discovery matches on never contain
//! substitutions.
//!
//! # Usage
//!
//! ```
//! use clift_llvm::demangle::demangle;
//!
//! let pretty = demangle("_ZN7Counter4pushEiP6Packet");
//! assert_eq!(pretty.as_deref(), Some("Counter::push(int, Packet*)"));
//! ```

/// Demangles `symbol`, returning `None` if it is not a mangled name or uses
/// constructs outside the supported subset.
#[must_use]
pub fn demangle(symbol: &str) -> Option<String> {
    let encoding = symbol.strip_prefix("_Z")?;
    let mut parser = Demangler {
        input: encoding.as_bytes(),
        pos:   0,
    };

    // Internal-linkage symbols carry an L marker before the name.
    parser.eat(b'L');

    let name = parser.parse_name()?;
    let mut args = Vec::new();
    while parser.pos < parser.input.len() {
        args.push(parser.parse_type()?);
    }

    // A mangled name with no parameter list names a data object rather than
    // a function.
    if args.is_empty() {
        return Some(name);
    }

    let args = match args.as_slice() {
        [single] if single == "void" => String::new(),
        _ => args.join(", "),
    };
    Some(format!("{name}({args})"))
}

/// Demangles `symbol`, passing it through unchanged when it cannot be
/// demangled.
#[must_use]
pub fn try_demangle(symbol: &str) -> String {
    demangle(symbol).unwrap_or_else(|| symbol.to_string())
}

/// The recursive-descent parser over one mangled name.
struct Demangler<'a> {
    input: &'a [u8],
    pos:   usize,
}

impl Demangler<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_number(&mut self) -> Option<usize> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }

    /// Parses a `<len><chars>` source name.
    fn parse_source_name(&mut self) -> Option<String> {
        let len = self.parse_number()?;
        let end = self.pos.checked_add(len)?;
        if end > self.input.len() {
            return None;
        }
        let name = std::str::from_utf8(&self.input[self.pos..end]).ok()?;
        self.pos = end;
        Some(name.to_string())
    }

    /// Parses an entity name, which is either a bare source name or an
    /// `N ... E` nested name.
    fn parse_name(&mut self) -> Option<String> {
        if !self.eat(b'N') {
            let mut name = self.parse_source_name()?;
            if self.peek() == Some(b'I') {
                name.push_str(&self.parse_template_args()?);
            }
            return Some(name);
        }

        // CV qualifiers on member functions precede the segments.
        while matches!(self.peek(), Some(b'K' | b'V' | b'r')) {
            self.pos += 1;
        }

        let mut segments: Vec<String> = Vec::new();
        while !self.eat(b'E') {
            let segment = self.parse_segment(segments.last().map(String::as_str))?;
            segments.push(segment);
        }
        if segments.is_empty() {
            return None;
        }
        Some(segments.join("::"))
    }

    /// Parses one segment of a nested name. Constructor and destructor
    /// segments take their name from `enclosing`, the previous segment.
    fn parse_segment(&mut self, enclosing: Option<&str>) -> Option<String> {
        let mut segment = match self.peek()? {
            b'0'..=b'9' => self.parse_source_name()?,
            b'C' => {
                self.pos += 1;
                if !matches!(self.bump()?, b'1'..=b'3') {
                    return None;
                }
                template_base(enclosing?).to_string()
            }
            b'D' => {
                self.pos += 1;
                if !matches!(self.bump()?, b'0'..=b'2') {
                    return None;
                }
                format!("~{}", template_base(enclosing?))
            }
            _ => return None,
        };

        if self.peek() == Some(b'I') {
            segment.push_str(&self.parse_template_args()?);
        }
        Some(segment)
    }

    /// Parses an `I ... E` template argument list, rendering it as
    /// `<arg, arg>`.
    fn parse_template_args(&mut self) -> Option<String> {
        if !self.eat(b'I') {
            return None;
        }
        let mut args = Vec::new();
        while !self.eat(b'E') {
            args.push(self.parse_type()?);
        }
        Some(format!("<{}>", args.join(", ")))
    }

    fn parse_type(&mut self) -> Option<String> {
        match self.peek()? {
            b'P' => {
                self.pos += 1;
                Some(format!("{}*", self.parse_type()?))
            }
            b'R' => {
                self.pos += 1;
                Some(format!("{}&", self.parse_type()?))
            }
            b'K' => {
                self.pos += 1;
                Some(format!("{} const", self.parse_type()?))
            }
            b'0'..=b'9' => {
                let mut name = self.parse_source_name()?;
                if self.peek() == Some(b'I') {
                    name.push_str(&self.parse_template_args()?);
                }
                Some(name)
            }
            b'N' => self.parse_name(),
            _ => {
                let code = self.bump()?;
                builtin_type(code).map(str::to_string)
            }
        }
    }
}

/// Truncates a class name at its template argument list, if it has one.
fn template_base(name: &str) -> &str {
    name.split('<').next().unwrap_or(name)
}

/// The builtin type codes we recognize.
fn builtin_type(code: u8) -> Option<&'static str> {
    Some(match code {
        b'v' => "void",
        b'b' => "bool",
        b'c' => "char",
        b'a' => "signed char",
        b'h' => "unsigned char",
        b's' => "short",
        b't' => "unsigned short",
        b'i' => "int",
        b'j' => "unsigned int",
        b'l' => "long",
        b'm' => "unsigned long",
        b'x' => "long long",
        b'y' => "unsigned long long",
        b'f' => "float",
        b'd' => "double",
        b'w' => "wchar_t",
        b'z' => "...",
        _ => return None,
    })
}
