use regex::Regex;
use tracing::instrument;

use crate::builder::TreeBuilder;
use crate::errors::{TreeError, TreeResult};
use crate::model::{NodeId, PhyloTree};

/// Characters that terminate an unquoted label.
const LABEL_DELIMITERS: &[u8] = b"()[]{}:;,";

/// Parses a single Newick tree string.
pub fn parse_newick(input: &str) -> TreeResult<PhyloTree> {
    NewickParser::new().parse(input)
}

/// Parser for Newick tree strings.
///
/// Supports multifurcations, quoted labels, internal-node labels, branch
/// lengths and BEAST-style comment annotations (`[&key=value,...]`), which
/// are stored in the node annotation maps. Plain square-bracket comments are
/// skipped. The walk is iterative with an explicit clade stack, so arbitrary
/// ladderized trees parse without recursion-depth limits.
pub struct NewickParser {
    annotation_re: Regex,
}

impl Default for NewickParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NewickParser {
    pub fn new() -> Self {
        Self {
            annotation_re: Regex::new(r#"([A-Za-z_][A-Za-z0-9_.%+\-]*)=("[^"]*"|\{[^}]*\}|[^,\]]+)"#)
                .unwrap(),
        }
    }

    #[instrument(level = "debug", skip(self, input))]
    pub fn parse(&self, input: &str) -> TreeResult<PhyloTree> {
        let mut scan = Scanner::new(input);
        let mut builder = TreeBuilder::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut finished = false;

        loop {
            scan.skip_filler();
            let Some(byte) = scan.peek() else {
                return Err(scan.syntax("unexpected end of input, expected ';'"));
            };
            match byte {
                b'(' => {
                    if finished {
                        return Err(scan.syntax("unexpected '(' after the tree was closed"));
                    }
                    scan.bump();
                    let node = builder.add_node(stack.last().copied());
                    stack.push(node);
                }
                b')' => {
                    scan.bump();
                    let node = stack
                        .pop()
                        .ok_or_else(|| scan.syntax("unbalanced ')'"))?;
                    self.read_suffix(&mut scan, &mut builder, node)?;
                    if stack.is_empty() {
                        finished = true;
                    }
                }
                b',' => {
                    if stack.is_empty() {
                        return Err(scan.syntax("',' outside of any clade"));
                    }
                    scan.bump();
                }
                b';' => {
                    scan.bump();
                    if !stack.is_empty() {
                        return Err(scan.syntax("';' before all clades were closed"));
                    }
                    if !finished {
                        return Err(TreeError::EmptyInput);
                    }
                    break;
                }
                _ => {
                    if finished {
                        return Err(scan.syntax("trailing characters after the tree"));
                    }
                    if byte != b'\'' && !is_label_byte(byte) {
                        return Err(scan.syntax("unexpected character"));
                    }
                    // A leaf, or a bare single-node tree such as "a:0.1;"
                    let node = builder.add_node(stack.last().copied());
                    self.read_suffix(&mut scan, &mut builder, node)?;
                    if stack.is_empty() {
                        finished = true;
                    }
                }
            }
        }

        builder.build()
    }

    /// Reads the optional label, annotations and branch length that follow a
    /// leaf token or a closing parenthesis.
    fn read_suffix(
        &self,
        scan: &mut Scanner<'_>,
        builder: &mut TreeBuilder,
        node: NodeId,
    ) -> TreeResult<()> {
        scan.skip_whitespace();
        let label = match scan.peek() {
            Some(b'\'') => Some(scan.read_quoted_label()?),
            Some(byte) if is_label_byte(byte) => Some(scan.read_unquoted_label().to_string()),
            _ => None,
        };
        if let Some(label) = label {
            builder.set_label(node, label);
        }

        loop {
            scan.skip_whitespace();
            match scan.peek() {
                Some(b'[') => {
                    if let Some(body) = scan.read_comment()? {
                        for capture in self.annotation_re.captures_iter(&body) {
                            let key = capture[1].to_string();
                            let value = unquote_value(&capture[2]);
                            builder.set_annotation(node, &key, value);
                        }
                    }
                }
                Some(b':') => {
                    scan.bump();
                    scan.skip_whitespace();
                    let length = scan.read_number()?;
                    builder.set_branch_length(node, length)?;
                }
                _ => break,
            }
        }
        Ok(())
    }
}

fn is_label_byte(byte: u8) -> bool {
    !byte.is_ascii_whitespace() && !LABEL_DELIMITERS.contains(&byte) && byte != b'\''
}

/// Strips surrounding double quotes from an annotation value.
fn unquote_value(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

/// Byte-level cursor over the input with position tracking for errors.
struct Scanner<'a> {
    bytes: &'a [u8],
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            input,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn syntax(&self, reason: &str) -> TreeError {
        TreeError::Syntax {
            position: self.pos,
            reason: reason.to_string(),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(byte) if byte.is_ascii_whitespace()) {
            self.bump();
        }
    }

    /// Skips whitespace and any comments between tokens, including rooting
    /// comments such as `[&R]` before the first parenthesis.
    fn skip_filler(&mut self) {
        loop {
            self.skip_whitespace();
            if self.peek() == Some(b'[') {
                while let Some(byte) = self.peek() {
                    self.bump();
                    if byte == b']' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    /// Reads a `[...]` comment; returns its body when it is a `[&...]`
    /// annotation, None for plain comments.
    fn read_comment(&mut self) -> TreeResult<Option<String>> {
        let open = self.pos;
        self.bump(); // consume '['
        let body_start = self.pos;
        while let Some(byte) = self.peek() {
            if byte == b']' {
                let body = &self.input[body_start..self.pos];
                self.bump();
                return Ok(match body.strip_prefix('&') {
                    Some(annotation) => Some(annotation.to_string()),
                    None => None,
                });
            }
            self.bump();
        }
        Err(TreeError::Syntax {
            position: open,
            reason: "unterminated comment".to_string(),
        })
    }

    fn read_unquoted_label(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(byte) if is_label_byte(byte)) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    /// Reads a label in single quotes, with `''` escaping a literal quote.
    fn read_quoted_label(&mut self) -> TreeResult<String> {
        let open = self.pos;
        self.bump(); // consume opening quote
        let mut label = Vec::new();
        while let Some(byte) = self.peek() {
            self.bump();
            if byte == b'\'' {
                if self.peek() == Some(b'\'') {
                    label.push(b'\'');
                    self.bump();
                } else {
                    return String::from_utf8(label).map_err(|_| TreeError::Syntax {
                        position: open,
                        reason: "label is not valid UTF-8".to_string(),
                    });
                }
            } else {
                label.push(byte);
            }
        }
        Err(TreeError::Syntax {
            position: open,
            reason: "unterminated quoted label".to_string(),
        })
    }

    fn read_number(&mut self) -> TreeResult<f64> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(byte) if byte.is_ascii_digit() || matches!(byte, b'.' | b'+' | b'-' | b'e' | b'E')
        ) {
            self.bump();
        }
        let text = &self.input[start..self.pos];
        let value: f64 = text.parse().map_err(|_| TreeError::Syntax {
            position: start,
            reason: format!("invalid branch length '{text}'"),
        })?;
        if !value.is_finite() {
            return Err(TreeError::Syntax {
                position: start,
                reason: format!("branch length '{text}' is not finite"),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_quoted_label_with_escape_when_parsing_then_unescapes() {
        let tree = parse_newick("('it''s a leaf':1,b:2);").unwrap();
        let labels: Vec<String> = tree.leaves().map(|l| tree.display_name(l)).collect();
        assert_eq!(labels, vec!["it's a leaf".to_string(), "b".to_string()]);
    }

    #[test]
    fn given_annotation_with_quoted_value_when_parsing_then_strips_quotes() {
        let tree = parse_newick(r#"(a[&location="New York"]:1,b[&location=Lima]:2);"#).unwrap();
        let a = tree.leaves().next().unwrap();
        assert_eq!(tree.annotation(a, "location"), Some("New York"));
    }

    #[test]
    fn given_plain_comment_when_parsing_then_ignores_it() {
        let tree = parse_newick("[this is a comment](a:1,b:2)[another];").unwrap();
        assert_eq!(tree.num_leaves(), 2);
    }

    #[test]
    fn given_unterminated_clade_when_parsing_then_reports_position() {
        let err = parse_newick("((a:1,b:2);").unwrap_err();
        assert!(matches!(err, TreeError::Syntax { .. }));
    }
}
