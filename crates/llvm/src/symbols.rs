//! String utilities for slicing up demangled C++ names.
//!
//! These operate on the textual form produced by [`crate::demangle`], and are
//! used when matching runtime calls against the builtin registry and when
//! deriving element names from entry-point signatures.

/// Checks whether `name` carries a template argument list that is balanced at
/// the top level.
#[must_use]
pub fn is_template(name: &str) -> bool {
    let mut depth = 0usize;
    let mut found = false;
    for c in name.chars() {
        match c {
            '<' => {
                depth += 1;
                found = true;
            }
            '>' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    found && depth == 0
}

/// Checks whether `name` names a class member, which is any name with a `::`
/// qualifier.
#[must_use]
pub fn is_class_method(name: &str) -> bool {
    name.contains("::")
}

/// Gets the class-qualifier prefix of `name`, or the whole name when it has
/// no qualifier.
#[must_use]
pub fn class_name(name: &str) -> &str {
    match name.find("::") {
        Some(position) => &name[..position],
        None => name,
    }
}

/// Gets everything before the first `<` in `name`.
#[must_use]
pub fn template_base(name: &str) -> &str {
    match name.find('<') {
        Some(position) => &name[..position],
        None => name,
    }
}

/// Removes template argument lists from `name`, keeping only text outside
/// any angle brackets.
#[must_use]
pub fn strip_template_args(name: &str) -> String {
    let mut depth = 0usize;
    let mut result = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 => result.push(c),
            _ => {}
        }
    }
    result
}

/// Removes parenthesized argument lists from `name`, keeping only text
/// outside any parentheses.
#[must_use]
pub fn strip_function_args(name: &str) -> String {
    let mut depth = 0usize;
    let mut result = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => result.push(c),
            _ => {}
        }
    }
    result
}

/// Truncates `name` at its first `(`.
#[must_use]
pub fn strip_function_parens(name: &str) -> &str {
    match name.find('(') {
        Some(position) => &name[..position],
        None => name,
    }
}
