use std::fmt;

use super::{NodeRef, RBTree};

/// A rendered subtree: its lines, the column its root sits over and its
/// total width.
#[derive(Default)]
struct Block {
    lines: Vec<String>,
    pos: usize,
    width: usize,
}

fn spaces(n: usize) -> String {
    " ".repeat(n)
}

/// Centers `label` in `width` columns, padding with dots. An outermost dot
/// on either end is blanked so the label reads as hanging off its branches.
fn center(label: &str, width: usize) -> String {
    let fill = width.saturating_sub(label.chars().count());
    let mut out = format!("{}{label}{}", ".".repeat(fill / 2), ".".repeat(fill - fill / 2));

    if out.starts_with('.') {
        out.replace_range(..1, " ");
    }
    if out.ends_with('.') {
        let last = out.len() - 1;
        out.replace_range(last.., " ");
    }
    out
}

fn layout<K: fmt::Display>(node: NodeRef<'_, K>) -> Block {
    let Some(key) = node.key() else { return Block::default() };

    let mut label = format!("{}:{key}", node.color().tag());
    let label_len = label.chars().count();

    let mut left = layout(node.left());
    let mut right = layout(node.right());

    let middle = (right.pos + left.width + 1 - left.pos).max(label_len).max(2);
    let pos = left.pos + middle / 2;
    let width = left.pos + middle + right.width - right.pos;

    while left.lines.len() < right.lines.len() {
        left.lines.push(spaces(left.width));
    }
    while right.lines.len() < left.lines.len() {
        right.lines.push(spaces(right.width));
    }

    // nudge left children's labels towards their parent
    if (middle - label_len) % 2 == 1 && node.is_left_child() && label_len < middle {
        label.push('.');
    }
    let label = center(&label, middle);

    let tail = spaces(right.width - right.pos);
    let mut lines = vec![
        format!("{}{label}{tail}", spaces(left.pos)),
        format!("{}/{}\\{tail}", spaces(left.pos), spaces(middle - 2)),
    ];

    let gap = spaces(width - left.width - right.width);
    lines.extend(
        left.lines
            .iter()
            .zip(&right.lines)
            .map(|(l, r)| format!("{l}{gap}{r}")),
    );

    Block { lines, pos, width }
}

/// Draws the tree top-down, one `color:key` label per node.
///
/// Only meant for eyeballing failing trees; the exact layout carries no
/// meaning.
impl<K: fmt::Display> fmt::Display for RBTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("B:empty");
        }
        f.write_str(&layout(self.root()).lines.join("\n"))
    }
}
