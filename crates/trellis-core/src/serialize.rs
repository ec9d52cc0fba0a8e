//! DOT serialization.
//!
//! Output is a pure function of the graph: the same graph always serializes
//! to the same bytes. Nodes, links, subgraphs and attributes are written in
//! insertion order.
//!
//! # Layout
//!
//! ```text
//! [strict ](digraph|graph) [name ]{
//! graph [k=v,...]
//! node [k=v,...]
//! edge [k=v,...]
//! <node statements>
//! <subgraphs that no link points at>
//! <link statements>
//! }
//! ```
//!
//! A node statement is written when the node carries attributes or when no
//! link of the same graph references it; linked nodes without attributes are
//! implied by their links.

use std::{
    borrow::Cow,
    fmt::{self, Write},
};

use crate::{
    attribute::{AttrValue, Attributes},
    model::{Endpoint, Graph, LinkTarget},
};

const KEYWORDS: [&str; 6] = ["node", "edge", "graph", "digraph", "subgraph", "strict"];

/// Serializes `graph` to DOT text.
pub fn to_dot(graph: &Graph) -> String {
    let mut out = String::new();
    // Writing into a `String` cannot fail.
    let _ = write_dot(graph, &mut out);
    out
}

/// Writes `graph` as DOT text into `out`.
///
/// # Errors
///
/// Returns the writer's error.
pub fn write_dot<W: Write>(graph: &Graph, out: &mut W) -> fmt::Result {
    DotWriter {
        out,
        directed: graph.is_directed(),
    }
    .document(graph)
}

/// Formats `text` as a DOT identifier, quoting only when needed.
///
/// Text that is a plain identifier or a numeral and not a keyword is returned
/// unchanged. Anything else is double-quoted with embedded quotes escaped,
/// newlines written as `\n` and a trailing odd run of backslashes balanced so
/// the closing quote is not escaped.
pub fn quote(text: &str) -> Cow<'_, str> {
    if (is_identifier(text) || is_numeral(text)) && !is_keyword(text) {
        return Cow::Borrowed(text);
    }

    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(ch),
        }
    }
    let trailing_backslashes = text.chars().rev().take_while(|ch| *ch == '\\').count();
    if trailing_backslashes % 2 == 1 {
        quoted.push('\\');
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || !ch.is_ascii()
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if is_identifier_start(first) => {
            chars.all(|ch| is_identifier_start(ch) || ch.is_ascii_digit())
        }
        _ => false,
    }
}

/// `[-]?(.[0-9]+ | [0-9]+(.[0-9]*)?)`
fn is_numeral(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };
    let all_digits = |part: &str| part.chars().all(|ch| ch.is_ascii_digit());

    match frac {
        None => !int.is_empty() && all_digits(int),
        Some(frac) => {
            all_digits(int) && all_digits(frac) && (!int.is_empty() || !frac.is_empty())
        }
    }
}

fn is_keyword(text: &str) -> bool {
    KEYWORDS
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case(text))
}

struct DotWriter<'w, W> {
    out: &'w mut W,
    directed: bool,
}

impl<W: Write> DotWriter<'_, W> {
    fn document(&mut self, graph: &Graph) -> fmt::Result {
        if graph.is_strict() {
            self.out.write_str("strict ")?;
        }
        self.out.write_str(if self.directed { "digraph " } else { "graph " })?;
        if !graph.name().is_empty() {
            write!(self.out, "{} ", quote(graph.name()))?;
        }
        self.body(graph)?;
        self.out.write_char('\n')
    }

    fn subgraph(&mut self, graph: &Graph) -> fmt::Result {
        if graph.is_cluster() {
            let name = format!("cluster_{}", graph.name());
            write!(self.out, "subgraph {} ", quote(&name))?;
        } else if !graph.name().is_empty() {
            write!(self.out, "subgraph {} ", quote(graph.name()))?;
        }
        self.body(graph)
    }

    fn body(&mut self, graph: &Graph) -> fmt::Result {
        self.out.write_str("{\n")?;

        self.defaults("graph", graph.graph_attrs())?;
        self.defaults("node", graph.node_attrs())?;
        self.defaults("edge", graph.edge_attrs())?;

        for node in graph.nodes() {
            if !node.attributes().is_empty() || !graph.is_linked(node.name()) {
                self.out.write_str(&quote(node.name()))?;
                self.attr_list(node.attributes())?;
                self.out.write_char('\n')?;
            }
        }

        for (id, subgraph) in graph.subgraphs() {
            if !graph.is_link_target(id) {
                self.subgraph(subgraph)?;
                self.out.write_char('\n')?;
            }
        }

        for link in graph.links() {
            self.endpoint(link.source())?;
            self.out.write_str(if self.directed { " -> " } else { " -- " })?;
            match link.target() {
                LinkTarget::Node(endpoint) => self.endpoint(endpoint)?,
                LinkTarget::Subgraph(id) => {
                    if let Some(subgraph) = graph.get_subgraph(*id) {
                        self.subgraph(subgraph)?;
                    }
                }
            }
            self.attr_list(link.attributes())?;
            self.out.write_char('\n')?;
        }

        self.out.write_char('}')
    }

    fn defaults(&mut self, statement: &str, attrs: &Attributes) -> fmt::Result {
        if visible(attrs).next().is_none() {
            return Ok(());
        }
        self.out.write_str(statement)?;
        self.attr_list(attrs)?;
        self.out.write_char('\n')
    }

    fn endpoint(&mut self, endpoint: &Endpoint) -> fmt::Result {
        self.out.write_str(&quote(endpoint.node()))?;
        if let Some(record) = endpoint.record() {
            write!(self.out, ":{}", quote(record))?;
        }
        if let Some(compass) = endpoint.compass() {
            write!(self.out, ":{compass}")?;
        }
        Ok(())
    }

    fn attr_list(&mut self, attrs: &Attributes) -> fmt::Result {
        let mut entries = visible(attrs).peekable();
        if entries.peek().is_none() {
            return Ok(());
        }
        self.out.write_str(" [")?;
        for (idx, (key, value)) in entries.enumerate() {
            if idx > 0 {
                self.out.write_char(',')?;
            }
            write!(self.out, "{}=", quote(key))?;
            self.value(value)?;
        }
        self.out.write_char(']')
    }

    fn value(&mut self, value: &AttrValue) -> fmt::Result {
        match value {
            AttrValue::Html(markup) => write!(self.out, "<{markup}>"),
            AttrValue::Text(text) => self.out.write_str(&quote(text)),
            other => self.out.write_str(&quote(&other.to_string())),
        }
    }
}

/// Entries that are written; keys starting with `$` are internal.
fn visible(attrs: &Attributes) -> impl Iterator<Item = (&str, &AttrValue)> {
    attrs.iter().filter(|(key, _)| !key.starts_with('$'))
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_dot(self, f)
    }
}
