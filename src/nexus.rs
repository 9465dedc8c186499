use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::errors::{TreeError, TreeResult};
use crate::model::{NodeId, PhyloTree};
use crate::newick::NewickParser;

/// Parses the first tree of a Nexus file.
///
/// Only what tree analysis needs is read: the `#NEXUS` header, the TREES
/// block with its optional TRANSLATE table, and the first TREE statement.
/// All other blocks are skipped. Rooting comments (`[&R]`, `[&U]`) and
/// BEAST-style annotations inside the tree statement are handled by the
/// Newick parser.
#[instrument(level = "debug", skip(input))]
pub fn parse_nexus(input: &str) -> TreeResult<PhyloTree> {
    if !input.trim_start().to_ascii_uppercase().starts_with("#NEXUS") {
        return Err(TreeError::Syntax {
            position: 0,
            reason: "missing #NEXUS header".to_string(),
        });
    }

    let body = trees_block(input)?;
    let mut translate: HashMap<String, String> = HashMap::new();

    for statement in split_statements(body) {
        let statement = statement.trim();
        if starts_with_word(statement, "translate") {
            translate = parse_translate(&statement["translate".len()..]);
            debug!(taxa = translate.len(), "parsed translate table");
        } else if starts_with_word(statement, "tree") {
            return parse_tree_statement(statement, &translate);
        }
    }

    Err(TreeError::EmptyInput)
}

/// Locates the content of the TREES block, between `BEGIN TREES;` and `END;`.
fn trees_block(input: &str) -> TreeResult<&str> {
    let lower = input.to_ascii_lowercase();
    let begin = lower.find("begin trees").ok_or_else(|| TreeError::Syntax {
        position: 0,
        reason: "no TREES block found".to_string(),
    })?;
    let body_start = lower[begin..]
        .find(';')
        .map(|offset| begin + offset + 1)
        .ok_or_else(|| TreeError::Syntax {
            position: begin,
            reason: "unterminated BEGIN TREES command".to_string(),
        })?;
    let body_end = lower[body_start..]
        .find("end;")
        .map(|offset| body_start + offset)
        .ok_or_else(|| TreeError::Syntax {
            position: body_start,
            reason: "TREES block is missing END;".to_string(),
        })?;
    Ok(&input[body_start..body_end])
}

/// Splits block content into `;`-terminated statements, honoring quotes.
fn split_statements(body: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut in_single = false;
    let mut in_double = false;
    for (pos, ch) in body.char_indices() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            ';' if !in_single && !in_double => {
                statements.push(&body[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    statements
}

/// Parses TRANSLATE entries of the form `1 label, 2 'other label', ...`.
fn parse_translate(entries: &str) -> HashMap<String, String> {
    let mut table = HashMap::new();
    for entry in entries.split(',') {
        let entry = entry.trim();
        let Some((key, label)) = entry.split_once(char::is_whitespace) else {
            continue;
        };
        table.insert(key.to_string(), unquote(label.trim()));
    }
    table
}

fn parse_tree_statement(
    statement: &str,
    translate: &HashMap<String, String>,
) -> TreeResult<PhyloTree> {
    let eq = statement.find('=').ok_or_else(|| TreeError::Syntax {
        position: 0,
        reason: "TREE statement has no '='".to_string(),
    })?;
    let name = statement["tree".len()..eq]
        .trim()
        .trim_start_matches('*')
        .trim()
        .to_string();
    let newick_src = format!("{};", statement[eq + 1..].trim());

    let mut tree = NewickParser::new().parse(&newick_src)?;
    apply_translate(&mut tree, translate);
    if !name.is_empty() {
        tree.set_name(name);
    }
    Ok(tree)
}

/// Replaces leaf labels through the TRANSLATE table, where present.
fn apply_translate(tree: &mut PhyloTree, translate: &HashMap<String, String>) {
    if translate.is_empty() {
        return;
    }
    let remap: Vec<(NodeId, String)> = tree
        .leaves()
        .filter_map(|leaf| {
            tree.node(leaf)
                .and_then(|node| node.data.label.as_ref())
                .and_then(|label| translate.get(label))
                .map(|resolved| (leaf, resolved.clone()))
        })
        .collect();
    for (leaf, label) in remap {
        if let Some(node) = tree.node_mut(leaf) {
            node.data.label = Some(label);
        }
    }
}

fn starts_with_word(statement: &str, word: &str) -> bool {
    statement.len() >= word.len() && statement[..word.len()].eq_ignore_ascii_case(word)
}

fn unquote(label: &str) -> String {
    label
        .strip_prefix('\'')
        .and_then(|l| l.strip_suffix('\''))
        .map(|l| l.replace("''", "'"))
        .unwrap_or_else(|| label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "#NEXUS\n\
        BEGIN TAXA;\n\tDIMENSIONS NTAX=3;\n\tTAXLABELS a b c;\nEND;\n\
        BEGIN TREES;\n\tTRANSLATE\n\t\t1 a,\n\t\t2 b,\n\t\t3 c;\n\
        \tTREE tree1 = [&R] ((1:1.0,2:1.0):0.5,3:1.5);\nEND;\n";

    #[test]
    fn given_translate_table_when_parsing_then_leaf_labels_are_resolved() {
        let tree = parse_nexus(MINIMAL).unwrap();
        let mut labels: Vec<String> = tree.leaves().map(|l| tree.display_name(l)).collect();
        labels.sort();
        assert_eq!(labels, vec!["a", "b", "c"]);
        assert_eq!(tree.name(), Some("tree1"));
    }

    #[test]
    fn given_missing_header_when_parsing_then_errors() {
        let err = parse_nexus("BEGIN TREES; TREE t = (a,b); END;").unwrap_err();
        assert!(matches!(err, TreeError::Syntax { .. }));
    }

    #[test]
    fn given_no_tree_statement_when_parsing_then_reports_empty_input() {
        let err = parse_nexus("#NEXUS\nBEGIN TREES;\nEND;\n").unwrap_err();
        assert!(matches!(err, TreeError::EmptyInput));
    }
}
