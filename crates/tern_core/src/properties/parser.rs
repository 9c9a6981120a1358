//! Properties text parser.
//!
//! Line oriented, like the rest of the engine's text formats.
//!
//! # Supported Syntax
//!
//! - `// comment` lines
//! - `name = value`
//! - `name value` and bare `name`
//! - `name [id] [: parentId] {` with the brace on the same or the next line
//! - `name [id] { key = value }` on a single line
//! - `}`

use std::collections::VecDeque;

use super::{Properties, PropertiesError, PropertiesResult};

/// Properties file parser.
pub struct PropertiesParser {
    lines: VecDeque<(usize, String)>,
}

impl PropertiesParser {
    /// Create a new parser from file contents.
    pub fn new(content: &str) -> Self {
        let lines = content
            .lines()
            .enumerate()
            .map(|(i, s)| (i + 1, s.to_string()))
            .collect();

        Self { lines }
    }

    /// Parse the content and return the root namespace.
    pub fn parse(mut self) -> PropertiesResult<Properties> {
        let mut root = Properties::default();
        self.parse_block(&mut root, None)?;
        resolve_inheritance(&mut root);
        Ok(root)
    }

    /// Pop the next meaningful line, trimmed.
    fn next_line(&mut self) -> Option<(usize, String)> {
        while let Some((num, line)) = self.lines.pop_front() {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with("//") {
                return Some((num, trimmed.to_string()));
            }
        }
        None
    }

    /// Parse namespace content until the matching `}`.
    ///
    /// `opened_at` is `None` for the root, which ends at end of input instead.
    fn parse_block(&mut self, target: &mut Properties, opened_at: Option<usize>) -> PropertiesResult<()> {
        loop {
            let Some((line_num, line)) = self.next_line() else {
                return match opened_at {
                    Some(start) => Err(PropertiesError::UnclosedBlock(start)),
                    None => Ok(()),
                };
            };

            if line == "}" {
                return close(opened_at, line_num);
            }

            let eq = line.find('=');
            let brace = line.find('{');

            match (eq, brace) {
                (_, Some(b)) if eq.map_or(true, |e| b < e) => {
                    let mut child = parse_header(&line[..b], line_num)?;
                    self.push_inline_body(line_num, &line[b + 1..]);
                    self.parse_block(&mut child, Some(line_num))?;
                    target.children.push(child);
                }
                (Some(e), _) => {
                    let name = line[..e].trim();
                    let mut value = line[e + 1..].trim();
                    let closes = value.ends_with('}');
                    if closes {
                        value = value[..value.len() - 1].trim_end();
                    }
                    if name.is_empty() {
                        return Err(parse_error(line_num, "property without a name"));
                    }
                    if value.is_empty() {
                        return Err(parse_error(
                            line_num,
                            format!("property '{}' has no value", name),
                        ));
                    }
                    target.set(name, value);
                    if closes {
                        return close(opened_at, line_num);
                    }
                }
                _ => {
                    if self.take_opening_brace() {
                        let mut child = parse_header(&line, line_num)?;
                        self.parse_block(&mut child, Some(line_num))?;
                        target.children.push(child);
                    } else {
                        // `name value`, or just `name`
                        let mut parts = line.splitn(2, char::is_whitespace);
                        let name = parts.next().unwrap_or_default();
                        let value = parts.next().map(str::trim).unwrap_or_default();
                        target.set(name, value);
                    }
                }
            }
        }
    }

    /// Re-queue whatever followed a `{` on the same line.
    fn push_inline_body(&mut self, line_num: usize, rest: &str) {
        let rest = rest.trim();
        if rest.is_empty() {
            return;
        }
        match rest.strip_suffix('}') {
            Some(inner) => {
                self.lines.push_front((line_num, "}".to_string()));
                let inner = inner.trim();
                if !inner.is_empty() {
                    self.lines.push_front((line_num, inner.to_string()));
                }
            }
            None => self.lines.push_front((line_num, rest.to_string())),
        }
    }

    /// Consume a `{` that starts the next meaningful line, if there is one.
    fn take_opening_brace(&mut self) -> bool {
        let Some((num, line)) = self.next_line() else {
            return false;
        };
        match line.strip_prefix('{') {
            Some(rest) => {
                let rest = rest.to_string();
                self.push_inline_body(num, &rest);
                true
            }
            None => {
                self.lines.push_front((num, line));
                false
            }
        }
    }
}

fn close(opened_at: Option<usize>, line_num: usize) -> PropertiesResult<()> {
    match opened_at {
        Some(_) => Ok(()),
        None => Err(parse_error(line_num, "unexpected '}'")),
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> PropertiesError {
    PropertiesError::Parse {
        line,
        message: message.into(),
    }
}

/// Parse `name [id] [: parentId]`.
fn parse_header(header: &str, line_num: usize) -> PropertiesResult<Properties> {
    let (left, parent) = match header.split_once(':') {
        Some((left, parent)) => (left, Some(parent.trim())),
        None => (header, None),
    };

    let mut tokens = left.split_whitespace();
    let Some(name) = tokens.next() else {
        return Err(parse_error(line_num, "namespace without a name"));
    };
    let id = tokens.next().unwrap_or_default();
    if let Some(extra) = tokens.next() {
        log::warn!(
            "Ignoring trailing token '{}' in namespace header at line {}",
            extra,
            line_num
        );
    }

    let mut props = Properties::new(name, id);
    props.parent_id = parent.filter(|p| !p.is_empty()).map(str::to_string);
    Ok(props)
}

/// Apply `name id : parentId` inheritance across the whole tree.
///
/// The derived namespace becomes a copy of its parent with its own data
/// merged over it. A parent is only copied once it has no pending parent of
/// its own, so chains resolve in order.
fn resolve_inheritance(root: &mut Properties) {
    loop {
        let mut pending = Vec::new();
        collect_pending(root, &mut Vec::new(), &mut pending);
        if pending.is_empty() {
            return;
        }

        let mut progressed = false;
        for path in pending {
            let Some(parent_id) = at_path(root, &path)
                .and_then(Properties::parent_id)
                .map(str::to_string)
            else {
                continue;
            };

            let Some(parent_path) = find_path(root, &parent_id, &mut Vec::new()) else {
                log::warn!("Namespace inherits from unknown parent '{}'", parent_id);
                if let Some(derived) = at_path_mut(root, &path) {
                    derived.parent_id = None;
                }
                progressed = true;
                continue;
            };

            if path.starts_with(&parent_path) {
                log::warn!("Namespace cannot inherit from its own ancestor '{}'", parent_id);
                if let Some(derived) = at_path_mut(root, &path) {
                    derived.parent_id = None;
                }
                progressed = true;
                continue;
            }

            let Some(parent) = at_path(root, &parent_path) else {
                continue;
            };
            if parent.parent_id.is_some() {
                // Wait until the parent is itself resolved.
                continue;
            }
            let base = parent.clone();

            if let Some(derived) = at_path_mut(root, &path) {
                let overrides = std::mem::take(derived);
                let mut merged = base;
                merged.namespace = overrides.namespace.clone();
                merged.id = overrides.id.clone();
                merged.parent_id = None;
                merged.dir_path = overrides.dir_path.clone();
                merged.merge_with(Properties {
                    parent_id: None,
                    ..overrides
                });
                *derived = merged;
                progressed = true;
            }
        }

        if !progressed {
            log::warn!("Cyclic namespace inheritance detected; leaving it unresolved");
            clear_pending(root);
            return;
        }
    }
}

fn collect_pending(props: &Properties, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    for (i, child) in props.children.iter().enumerate() {
        prefix.push(i);
        if child.parent_id.is_some() {
            out.push(prefix.clone());
        }
        collect_pending(child, prefix, out);
        prefix.pop();
    }
}

fn clear_pending(props: &mut Properties) {
    props.parent_id = None;
    for child in &mut props.children {
        clear_pending(child);
    }
}

/// Index path of the namespace [`Properties::namespace`] would return.
fn find_path(props: &Properties, id: &str, prefix: &mut Vec<usize>) -> Option<Vec<usize>> {
    for (i, child) in props.children.iter().enumerate() {
        prefix.push(i);
        if child.id == id {
            return Some(prefix.clone());
        }
        if let Some(found) = find_path(child, id, prefix) {
            return Some(found);
        }
        prefix.pop();
    }
    None
}

fn at_path<'a>(root: &'a Properties, path: &[usize]) -> Option<&'a Properties> {
    path.iter().try_fold(root, |p, &i| p.children.get(i))
}

fn at_path_mut<'a>(root: &'a mut Properties, path: &[usize]) -> Option<&'a mut Properties> {
    path.iter().try_fold(root, |p, &i| p.children.get_mut(i))
}

/// Parse properties text into a root namespace.
pub fn parse_properties(content: &str) -> PropertiesResult<Properties> {
    PropertiesParser::new(content).parse()
}
