//! Multi-dimensional traversal shared by the array codecs.
//!
//! Arrays travel flat on the wire in depth-first row-major order; in
//! text they nest. This module owns the shape arithmetic and the
//! conversions between the nested tree built by the text parser and the
//! flat element sequence stored in [`crate::value::ArrayValue`].

use crate::error::{CodecError, Result};

/// One node of a parsed nested array: a leaf (possibly null) or a
/// sub-array.
#[derive(Debug, Clone, PartialEq)]
pub enum Node<L> {
    Leaf(Option<L>),
    List(Vec<Node<L>>),
}

/// Total element count implied by a shape. Empty dims mean an empty
/// array, not a scalar.
pub fn element_count(dims: &[usize]) -> usize {
    if dims.is_empty() {
        0
    } else {
        dims.iter().product()
    }
}

/// Element count of one row of the outermost dimension.
pub fn inner_count(dims: &[usize]) -> usize {
    dims[1..].iter().product()
}

/// Split a flat element slice into its outermost-dimension rows.
///
/// Callers recurse with `&dims[1..]` per chunk; at `dims.len() == 1`
/// the chunk is a run of leaves.
pub fn rows<'a, T>(dims: &[usize], elements: &'a [T]) -> impl Iterator<Item = &'a [T]> {
    let chunk = inner_count(dims).max(1);
    elements.chunks(chunk)
}

/// Flatten a parsed top-level node list into `(dims, leaves)`.
///
/// `declared_depth` comes from the run of leading `{` in the text form
/// and fixes the expected nesting. Ragged rows, leaves above the leaf
/// level, and nesting deeper than declared are all shape violations.
pub fn flatten<L>(
    top: Vec<Node<L>>,
    declared_depth: usize,
) -> Result<(Vec<usize>, Vec<Option<L>>)> {
    let mut dims: Vec<usize> = Vec::with_capacity(declared_depth);
    dims.push(top.len());

    let mut leaves = Vec::new();
    for node in top {
        descend(node, declared_depth, 1, &mut dims, &mut leaves)?;
    }

    // Zero-length levels cut recursion short of the declared depth.
    while dims.len() < declared_depth.max(1) {
        dims.push(0);
    }
    Ok((dims, leaves))
}

fn descend<L>(
    node: Node<L>,
    declared_depth: usize,
    depth: usize,
    dims: &mut Vec<usize>,
    leaves: &mut Vec<Option<L>>,
) -> Result<()> {
    if depth < declared_depth {
        let Node::List(children) = node else {
            return Err(shape_error(format!(
                "element at depth {depth} where a {declared_depth}-dimensional array expects a sub-array"
            )));
        };
        match dims.get(depth) {
            None => dims.push(children.len()),
            Some(&expected) if expected == children.len() => {}
            Some(&expected) => {
                return Err(shape_error(format!(
                    "ragged sub-array: expected {expected} elements, found {}",
                    children.len()
                )));
            }
        }
        for child in children {
            descend(child, declared_depth, depth + 1, dims, leaves)?;
        }
        Ok(())
    } else {
        match node {
            Node::Leaf(value) => {
                leaves.push(value);
                Ok(())
            }
            Node::List(_) => Err(shape_error(format!(
                "sub-array nested deeper than the declared {declared_depth} dimensions"
            ))),
        }
    }
}

fn shape_error(detail: String) -> CodecError {
    CodecError::MalformedWireData(format!("inconsistent array dimensions: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_element_count() {
        assert_eq!(element_count(&[]), 0);
        assert_eq!(element_count(&[0]), 0);
        assert_eq!(element_count(&[3]), 3);
        assert_eq!(element_count(&[2, 3, 4]), 24);
    }

    #[test]
    fn test_rows_chunking() {
        let elems = [1, 2, 3, 4, 5, 6];
        let chunks: Vec<_> = rows(&[2, 3], &elems).collect();
        assert_eq!(chunks, vec![&[1, 2, 3][..], &[4, 5, 6][..]]);
    }

    #[test]
    fn test_flatten_two_dims() {
        let top = vec![
            Node::List(vec![Node::Leaf(Some(1)), Node::Leaf(Some(2))]),
            Node::List(vec![Node::Leaf(Some(3)), Node::Leaf(None)]),
        ];
        let (dims, leaves) = flatten(top, 2).unwrap();
        assert_eq!(dims, vec![2, 2]);
        assert_eq!(leaves, vec![Some(1), Some(2), Some(3), None]);
    }

    #[test]
    fn test_flatten_ragged_rejected() {
        let top = vec![
            Node::List(vec![Node::Leaf(Some(1))]),
            Node::List(vec![Node::Leaf(Some(2)), Node::Leaf(Some(3))]),
        ];
        assert!(flatten(top, 2).is_err());
    }

    #[test]
    fn test_flatten_mixed_depth_rejected() {
        let top: Vec<Node<i32>> = vec![
            Node::Leaf(Some(1)),
            Node::List(vec![Node::Leaf(Some(2))]),
        ];
        assert!(flatten(top, 2).is_err());
    }

    #[test]
    fn test_flatten_empty_levels() {
        let (dims, leaves) = flatten(Vec::<Node<i32>>::new(), 1).unwrap();
        assert_eq!(dims, vec![0]);
        assert!(leaves.is_empty());

        let top: Vec<Node<i32>> = vec![Node::List(vec![]), Node::List(vec![])];
        let (dims, leaves) = flatten(top, 2).unwrap();
        assert_eq!(dims, vec![2, 0]);
        assert!(leaves.is_empty());
    }
}
