//! Submission validation
//!
//! Walks the whole tree and collects every required attribute left empty,
//! locating each by node id and index path so the editor can point the
//! user at it.
//!
//! Author: Moroya Sakamoto

use crate::catalog;
use crate::error::{MissingValue, ValidationError};
use crate::tree::FieldTree;

/// Check every node against the catalog rules
pub fn validate_tree(tree: &FieldTree) -> Result<(), ValidationError> {
    if tree.is_empty() {
        return Err(ValidationError::EmptyForm);
    }
    let mut missing = Vec::new();
    let mut stack: Vec<(Vec<usize>, _)> = tree
        .roots()
        .iter()
        .enumerate()
        .rev()
        .map(|(i, &id)| (vec![i], id))
        .collect();
    while let Some((path, id)) = stack.pop() {
        let Some(node) = tree.find_by_id(id) else {
            continue;
        };
        for key in catalog::missing_values(&node.attributes) {
            missing.push(MissingValue {
                field: id,
                path: path.clone(),
                key,
            });
        }
        for (i, &child) in node.children().iter().enumerate().rev() {
            let mut child_path = path.clone();
            child_path.push(i);
            stack.push((child_path, child));
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingValues(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AttrKey;
    use crate::field::{Attributes, FieldNode};

    fn valid_leaf() -> Attributes {
        Attributes::new()
            .with(AttrKey::Code, "Y")
            .with(AttrKey::FieldType, "text")
            .with(AttrKey::FieldCode, "name")
    }

    #[test]
    fn test_empty_tree_rejected() {
        assert_eq!(validate_tree(&FieldTree::new()), Err(ValidationError::EmptyForm));
    }

    #[test]
    fn test_valid_tree_passes() {
        let mut tree = FieldTree::new();
        let a = tree
            .insert(
                None,
                FieldNode::with_attributes(
                    Attributes::new()
                        .with(AttrKey::Code, "X")
                        .with(AttrKey::FieldType, "header"),
                ),
            )
            .unwrap();
        tree.insert(Some(a), FieldNode::with_attributes(valid_leaf())).unwrap();
        assert_eq!(validate_tree(&tree), Ok(()));
    }

    #[test]
    fn test_missing_values_are_located() {
        let mut tree = FieldTree::new();
        let a = tree
            .insert(
                None,
                FieldNode::with_attributes(
                    Attributes::new()
                        .with(AttrKey::Code, "X")
                        .with(AttrKey::FieldType, "header"),
                ),
            )
            .unwrap();
        tree.insert(Some(a), FieldNode::with_attributes(valid_leaf())).unwrap();
        let bad = tree
            .insert(
                Some(a),
                FieldNode::with_attributes(valid_leaf().with(AttrKey::GuideUrl, "http://x")),
            )
            .unwrap();

        let err = validate_tree(&tree).unwrap_err();
        let missing = err.missing();
        assert_eq!(missing.len(), 2);
        assert!(missing.iter().all(|m| m.field == bad && m.path == vec![0, 1]));
        assert_eq!(missing[0].key, AttrKey::GuideUrlMode);
        assert_eq!(missing[1].key, AttrKey::GuideUrlType);
    }

    #[test]
    fn test_fresh_node_needs_code_type_and_field_code() {
        let mut tree = FieldTree::new();
        tree.insert(None, FieldNode::new()).unwrap();
        let err = validate_tree(&tree).unwrap_err();
        let keys: Vec<_> = err.missing().iter().map(|m| m.key).collect();
        // an empty field type is not parent-type, so fieldCode is required too
        assert_eq!(keys, vec![AttrKey::Code, AttrKey::FieldCode, AttrKey::FieldType]);
    }
}
